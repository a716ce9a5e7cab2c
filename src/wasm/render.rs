use js_sys::Float32Array;
use tracing::{debug, error};
use wasm_bindgen::JsCast;
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext as GL, WebGlBuffer, WebGlContextAttributes,
    WebGlPowerPreference, WebGlProgram, WebGlShader, WebGlUniformLocation, WebGlVertexArrayObject,
};

use crate::error::{EffectError, ShaderStage};
use crate::lifecycle::GraphicsBackend;
use crate::shader::{
    ShaderSources, Uniform, Uniforms, POSITION_ATTRIBUTE, QUAD_VERTICES, VERTEX_COUNT,
};
use crate::surface::PixelSize;

const FALLBACK_MAX_RENDERBUFFER: u32 = 4096;

fn context_attributes() -> WebGlContextAttributes {
    let attributes = WebGlContextAttributes::new();
    attributes.set_antialias(true);
    attributes.set_power_preference(WebGlPowerPreference::HighPerformance);
    attributes
}

struct Pipeline {
    program: WebGlProgram,
    buffer: WebGlBuffer,
    vao: WebGlVertexArrayObject,
    locations: Vec<(Uniform, Option<WebGlUniformLocation>)>,
}

/// WebGL2 context plus the lightning program built on it.
pub struct WebGlBackend {
    gl: GL,
    canvas: HtmlCanvasElement,
    pipeline: Option<Pipeline>,
}

impl WebGlBackend {
    /// `None` when the browser refuses a WebGL2 context.
    pub fn acquire(canvas: &HtmlCanvasElement) -> Option<Self> {
        let gl: GL = canvas
            .get_context_with_context_options("webgl2", &context_attributes())
            .ok()
            .flatten()?
            .dyn_into()
            .ok()?;
        Some(Self {
            gl,
            canvas: canvas.clone(),
            pipeline: None,
        })
    }

    fn compile(&self, stage: ShaderStage, source: &str) -> Result<WebGlShader, EffectError> {
        let kind = match stage {
            ShaderStage::Vertex => GL::VERTEX_SHADER,
            ShaderStage::Fragment => GL::FRAGMENT_SHADER,
        };
        let shader = self
            .gl
            .create_shader(kind)
            .ok_or(EffectError::Resource("shader"))?;
        self.gl.shader_source(&shader, source);
        self.gl.compile_shader(&shader);
        if self
            .gl
            .get_shader_parameter(&shader, GL::COMPILE_STATUS)
            .as_bool()
            .unwrap_or(false)
        {
            Ok(shader)
        } else {
            let log = self
                .gl
                .get_shader_info_log(&shader)
                .unwrap_or_else(|| "unknown shader error".to_owned());
            self.gl.delete_shader(Some(&shader));
            Err(EffectError::ShaderCompile { stage, log })
        }
    }

    fn link(&self, sources: &ShaderSources) -> Result<WebGlProgram, EffectError> {
        let vs = self.compile(ShaderStage::Vertex, &sources.vertex)?;
        let fs = match self.compile(ShaderStage::Fragment, &sources.fragment) {
            Ok(fs) => fs,
            Err(err) => {
                self.gl.delete_shader(Some(&vs));
                return Err(err);
            }
        };

        let program = self.gl.create_program();
        let result = match program {
            Some(program) => {
                self.gl.attach_shader(&program, &vs);
                self.gl.attach_shader(&program, &fs);
                self.gl.link_program(&program);
                let linked = self
                    .gl
                    .get_program_parameter(&program, GL::LINK_STATUS)
                    .as_bool()
                    .unwrap_or(false);
                if linked {
                    self.gl.detach_shader(&program, &vs);
                    self.gl.detach_shader(&program, &fs);
                    Ok(program)
                } else {
                    let log = self
                        .gl
                        .get_program_info_log(&program)
                        .unwrap_or_else(|| "unknown program error".to_owned());
                    self.gl.delete_program(Some(&program));
                    Err(EffectError::ProgramLink(log))
                }
            }
            None => Err(EffectError::Resource("program")),
        };
        self.gl.delete_shader(Some(&vs));
        self.gl.delete_shader(Some(&fs));
        result
    }

    fn build(&self, sources: &ShaderSources) -> Result<Pipeline, EffectError> {
        let program = self.link(sources)?;
        let gl = &self.gl;

        let Some(vao) = gl.create_vertex_array() else {
            gl.delete_program(Some(&program));
            return Err(EffectError::Resource("vertex array"));
        };
        let Some(buffer) = gl.create_buffer() else {
            gl.delete_vertex_array(Some(&vao));
            gl.delete_program(Some(&program));
            return Err(EffectError::Resource("vertex buffer"));
        };

        gl.bind_vertex_array(Some(&vao));
        gl.bind_buffer(GL::ARRAY_BUFFER, Some(&buffer));
        let vertices = Float32Array::from(&QUAD_VERTICES[..]);
        gl.buffer_data_with_array_buffer_view(GL::ARRAY_BUFFER, &vertices, GL::STATIC_DRAW);

        let position = gl.get_attrib_location(&program, POSITION_ATTRIBUTE);
        if position >= 0 {
            gl.enable_vertex_attrib_array(position as u32);
            gl.vertex_attrib_pointer_with_i32(position as u32, 2, GL::FLOAT, false, 0, 0);
        }
        gl.bind_vertex_array(None);

        let locations = Uniform::ALL
            .iter()
            .map(|&u| (u, gl.get_uniform_location(&program, u.name())))
            .collect();

        // Full-screen 2D pass.
        gl.disable(GL::DEPTH_TEST);
        gl.disable(GL::CULL_FACE);

        Ok(Pipeline {
            program,
            buffer,
            vao,
            locations,
        })
    }

    fn release(&mut self) {
        if let Some(p) = self.pipeline.take() {
            self.gl.delete_buffer(Some(&p.buffer));
            self.gl.delete_vertex_array(Some(&p.vao));
            self.gl.delete_program(Some(&p.program));
        }
    }
}

impl GraphicsBackend for WebGlBackend {
    fn max_renderbuffer_size(&self) -> u32 {
        self.gl
            .get_parameter(GL::MAX_RENDERBUFFER_SIZE)
            .ok()
            .and_then(|v| v.as_f64())
            .filter(|v| *v >= 1.0)
            .map(|v| v as u32)
            .unwrap_or(FALLBACK_MAX_RENDERBUFFER)
    }

    fn build_program(&mut self, sources: &ShaderSources) -> Result<(), EffectError> {
        self.release();
        let pipeline = self.build(sources)?;
        debug!("WebGL2 pipeline built");
        self.pipeline = Some(pipeline);
        Ok(())
    }

    fn resize_backing(&mut self, size: PixelSize) {
        self.canvas.set_width(size.width);
        self.canvas.set_height(size.height);
        self.gl
            .viewport(0, 0, size.width as i32, size.height as i32);
    }

    fn set_uniforms(&mut self, u: &Uniforms) {
        let Some(p) = self.pipeline.as_ref() else {
            return;
        };
        let gl = &self.gl;
        gl.use_program(Some(&p.program));
        for (uniform, location) in &p.locations {
            let location = location.as_ref();
            match uniform {
                Uniform::Resolution => gl.uniform2f(location, u.resolution[0], u.resolution[1]),
                Uniform::Time => gl.uniform1f(location, u.time),
                Uniform::Hue => gl.uniform1f(location, u.hue),
                Uniform::XOffset => gl.uniform1f(location, u.x_offset),
                Uniform::YOffset => gl.uniform1f(location, u.y_offset),
                Uniform::Speed => gl.uniform1f(location, u.speed),
                Uniform::Intensity => gl.uniform1f(location, u.intensity),
                Uniform::Size => gl.uniform1f(location, u.size),
                Uniform::Active => gl.uniform1f(location, if u.active { 1.0 } else { 0.0 }),
            }
        }
    }

    fn draw(&mut self) {
        let Some(p) = self.pipeline.as_ref() else {
            error!("draw without a pipeline");
            return;
        };
        self.gl.bind_vertex_array(Some(&p.vao));
        self.gl.draw_arrays(GL::TRIANGLES, 0, VERTEX_COUNT);
        self.gl.bind_vertex_array(None);
    }
}

impl Drop for WebGlBackend {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use wasm_bindgen::JsValue;
    use wasm_bindgen_test::*;

    use super::context_attributes;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn context_requests_antialiased_high_performance() {
        let attributes = context_attributes();
        let get = |key: &str| js_sys::Reflect::get(&attributes, &JsValue::from_str(key)).unwrap();
        assert_eq!(get("antialias").as_bool(), Some(true));
        assert_eq!(get("powerPreference").as_string().as_deref(), Some("high-performance"));
    }
}
