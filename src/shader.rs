//! The lightning shader program: GLSL sources, uniform table, and a CPU
//! reference of the per-pixel function.

use crate::config::EffectConfig;
use crate::noise::{fbm, hash11, hsv_to_rgb};

/// Full-screen quad as two triangles in clip space.
pub const QUAD_VERTICES: [f32; 12] = [
    -1.0, -1.0, //
    1.0, -1.0, //
    -1.0, 1.0, //
    -1.0, 1.0, //
    1.0, -1.0, //
    1.0, 1.0,
];

pub const VERTEX_COUNT: i32 = 6;

pub const POSITION_ATTRIBUTE: &str = "aPosition";

pub const VERTEX_SHADER: &str = r#"#version 300 es
in vec2 aPosition;
void main() {
    gl_Position = vec4(aPosition, 0.0, 1.0);
}
"#;

const FRAGMENT_HEADER: &str = r#"#version 300 es
precision highp float;

uniform vec2 iResolution;
uniform float iTime;
uniform float uHue;
uniform float uXOffset;
uniform float uYOffset;
uniform float uSpeed;
uniform float uIntensity;
uniform float uSize;
uniform float uActive;

out vec4 fragColor;
"#;

const FRAGMENT_BODY: &str = r#"
vec3 hsv2rgb(vec3 c) {
    vec3 rgb = clamp(abs(mod(c.x * 6.0 + vec3(0.0, 4.0, 2.0), 6.0) - 3.0) - 1.0, 0.0, 1.0);
    return c.z * mix(vec3(1.0), rgb, c.y);
}

float hash11(float p) {
    p = fract(p * .1031);
    p *= p + 33.33;
    p *= p + p;
    return fract(p);
}

float hash12(vec2 p) {
    vec3 p3 = fract(vec3(p.xyx) * .1031);
    p3 += dot(p3, p3.yzx + 33.33);
    return fract((p3.x + p3.y) * p3.z);
}

mat2 rotate2d(float theta) {
    float c = cos(theta);
    float s = sin(theta);
    return mat2(c, -s, s, c);
}

float noise(vec2 p) {
    vec2 ip = floor(p);
    vec2 fp = fract(p);
    float a = hash12(ip);
    float b = hash12(ip + vec2(1.0, 0.0));
    float c = hash12(ip + vec2(0.0, 1.0));
    float d = hash12(ip + vec2(1.0, 1.0));
    vec2 t = smoothstep(0.0, 1.0, fp);
    return mix(mix(a, b, t.x), mix(c, d, t.x), t.y);
}

float fbm(vec2 p) {
    float value = 0.0;
    float amplitude = 0.5;
    for (int i = 0; i < OCTAVE_COUNT; ++i) {
        value += amplitude * noise(p);
        p *= rotate2d(OCTAVE_ROTATION);
        p *= 2.0;
        amplitude *= 0.5;
    }
    return value;
}

void main() {
    vec2 uv = gl_FragCoord.xy / iResolution.xy;
    uv = 2.0 * uv - 1.0;
    uv.x *= iResolution.x / iResolution.y;
    uv.x += uXOffset;
    uv.y += uYOffset;
    vec2 base = uv;

    float t = iTime * uSpeed;
    uv += 2.0 * fbm(uv * uSize + 0.8 * t) - 1.0;

    float dist = abs(uv.x);
    vec3 baseColor = hsv2rgb(vec3(uHue / 360.0, 0.7, 0.8));
    vec3 col = baseColor * mix(0.0, 0.07, hash11(t)) / max(dist, 0.001) * uIntensity;

    if (uActive > 0.5) {
        vec2 forkUv = base * 2.5;
        float bend = 2.0 * fbm(forkUv * uSize + 1.3 * t + 17.0) - 1.0;
        float forkDist = abs(uv.x + 0.6 * bend);
        col += 0.35 * baseColor * mix(0.0, 0.05, hash11(t + 1.7)) / max(forkDist, 0.001) * uIntensity;
    }

    fragColor = vec4(col, 1.0);
}
"#;

/// Compile-time knobs baked into the fragment source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgramOptions {
    pub octaves: u32,
}

/// Vertex + fragment source pair ready for the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSources {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSources {
    pub fn new(options: ProgramOptions) -> Self {
        let fragment = format!(
            "{FRAGMENT_HEADER}\n#define OCTAVE_COUNT {}\n#define OCTAVE_ROTATION {:.2}\n{FRAGMENT_BODY}",
            options.octaves.max(1),
            crate::noise::OCTAVE_ROTATION,
        );
        Self {
            vertex: VERTEX_SHADER.to_owned(),
            fragment,
        }
    }
}

/// Uniform slots, in the order the backend looks them up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uniform {
    Resolution,
    Time,
    Hue,
    XOffset,
    YOffset,
    Speed,
    Intensity,
    Size,
    Active,
}

impl Uniform {
    pub const ALL: [Uniform; 9] = [
        Self::Resolution,
        Self::Time,
        Self::Hue,
        Self::XOffset,
        Self::YOffset,
        Self::Speed,
        Self::Intensity,
        Self::Size,
        Self::Active,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Resolution => "iResolution",
            Self::Time => "iTime",
            Self::Hue => "uHue",
            Self::XOffset => "uXOffset",
            Self::YOffset => "uYOffset",
            Self::Speed => "uSpeed",
            Self::Intensity => "uIntensity",
            Self::Size => "uSize",
            Self::Active => "uActive",
        }
    }
}

/// Values pushed to the program before every draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub hue: f32,
    pub x_offset: f32,
    pub y_offset: f32,
    pub speed: f32,
    pub intensity: f32,
    pub size: f32,
    pub active: bool,
}

impl Uniforms {
    pub fn new(config: &EffectConfig, width: u32, height: u32, time: f32) -> Self {
        Self {
            resolution: [width as f32, height as f32],
            time,
            hue: config.hue,
            x_offset: config.x_offset,
            y_offset: config.y_offset,
            speed: config.speed,
            intensity: config.intensity,
            size: config.size,
            active: config.active,
        }
    }
}

/// Evaluate the fragment program for one pixel on the CPU.
///
/// Matches the GLSL `main` above; returns linear RGB without clamping, the
/// way the GPU writes it before the framebuffer saturates.
pub fn shade(frag_x: f32, frag_y: f32, u: &Uniforms, octaves: u32) -> [f32; 3] {
    // Same floor the GPU program gets from `ShaderSources::new`.
    let octaves = octaves.max(1);
    let [w, h] = u.resolution;
    let mut x = 2.0 * frag_x / w - 1.0;
    let mut y = 2.0 * frag_y / h - 1.0;
    x *= w / h;
    x += u.x_offset;
    y += u.y_offset;
    let (bx, by) = (x, y);

    let t = u.time * u.speed;
    let n = 2.0 * fbm(x * u.size + 0.8 * t, y * u.size + 0.8 * t, octaves) - 1.0;
    x += n;

    let dist = x.abs();
    let base = hsv_to_rgb(u.hue / 360.0, 0.7, 0.8);
    let glow = 0.07 * hash11(t) / dist.max(0.001) * u.intensity;
    let mut col = base.map(|c| c * glow);

    if u.active {
        let (fx, fy) = (bx * 2.5, by * 2.5);
        let bend = 2.0 * fbm(fx * u.size + 1.3 * t + 17.0, fy * u.size + 1.3 * t + 17.0, octaves) - 1.0;
        let fork_dist = (x + 0.6 * bend).abs();
        let fork = 0.35 * 0.05 * hash11(t + 1.7) / fork_dist.max(0.001) * u.intensity;
        for (c, b) in col.iter_mut().zip(base) {
            *c += b * fork;
        }
    }
    col
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniforms(active: bool) -> Uniforms {
        let config = EffectConfig {
            active,
            ..EffectConfig::default()
        };
        Uniforms::new(&config, 640, 360, 3.25)
    }

    #[test]
    fn fragment_declares_every_uniform() {
        let sources = ShaderSources::new(ProgramOptions { octaves: 10 });
        for uniform in Uniform::ALL {
            assert!(
                sources.fragment.contains(&format!(" {};", uniform.name())),
                "missing {}",
                uniform.name()
            );
        }
        assert!(sources.vertex.contains(POSITION_ATTRIBUTE));
    }

    #[test]
    fn octave_count_is_baked_in() {
        let mobile = ShaderSources::new(ProgramOptions { octaves: 6 });
        assert!(mobile.fragment.contains("#define OCTAVE_COUNT 6\n"));
        assert!(mobile.fragment.contains("#define OCTAVE_ROTATION 0.45\n"));
        assert!(mobile.fragment.starts_with("#version 300 es"));
    }

    #[test]
    fn zero_octaves_shades_like_one() {
        let u = uniforms(true);
        assert_eq!(shade(200.0, 100.0, &u, 0), shade(200.0, 100.0, &u, 1));
        let sources = ShaderSources::new(ProgramOptions { octaves: 0 });
        assert!(sources.fragment.contains("#define OCTAVE_COUNT 1\n"));
    }

    #[test]
    fn shade_is_pure() {
        let u = uniforms(false);
        assert_eq!(shade(10.0, 20.0, &u, 6), shade(10.0, 20.0, &u, 6));
    }

    #[test]
    fn color_follows_hue() {
        let u = uniforms(false);
        let [r, g, b] = shade(320.0, 180.0, &u, 6);
        // Hue 142 is green dominated.
        assert!(g > r && g > b, "rgb = {r} {g} {b}");
    }

    #[test]
    fn intensity_scales_linearly() {
        let u1 = uniforms(false);
        let u2 = Uniforms {
            intensity: 2.0,
            ..u1
        };
        let a = shade(100.0, 50.0, &u1, 6);
        let b = shade(100.0, 50.0, &u2, 6);
        for (x, y) in a.iter().zip(b) {
            assert!((x * 2.0 - y).abs() <= 1e-4 * y.abs().max(1.0));
        }
    }

    #[test]
    fn active_flag_only_adds_light() {
        let off = uniforms(false);
        let on = uniforms(true);
        for px in [0.0, 160.0, 320.0, 480.0, 639.0] {
            let a = shade(px, 90.0, &off, 6);
            let b = shade(px, 90.0, &on, 6);
            for (x, y) in a.iter().zip(b) {
                assert!(y >= *x);
            }
        }
    }
}
