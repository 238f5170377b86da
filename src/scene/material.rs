//! Material conversion and texture file processing.
//!
//! Materials are registered once per run, namespace-qualified so scenes can
//! share them; meshes that reference an already-registered slot just reuse its
//! id. Texture images are pulled from the document's store and written next to
//! the scene file, converting non-web formats to PNG.

use std::io::Cursor;

use image::ImageFormat;

use crate::document::{MaterialDef, TextureDef, TextureSlot, TextureStore};
use crate::export::json::JsonWriter;
use crate::log::ExportLog;

/// A texture file to be written alongside the scene file.
#[derive(Debug, Clone)]
pub struct TextureOutput {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// One texture entry of an exported material.
#[derive(Debug, Clone)]
pub struct ExportTexture {
    /// Material field the entry is written under (`diffuseTexture`, ...).
    pub field: &'static str,
    pub file_name: String,
    pub level: f32,
    pub has_alpha: bool,
    pub coordinates_index: u32,
    pub coordinates_mode: u32,
    pub u_offset: f32,
    pub v_offset: f32,
    pub u_scale: f32,
    pub v_scale: f32,
    pub u_ang: f32,
    pub v_ang: f32,
    pub w_ang: f32,
    pub wrap_u: u32,
    pub wrap_v: u32,
}

impl ExportTexture {
    pub fn write(&self, w: &mut JsonWriter) {
        w.key(self.field);
        w.begin_object();
        w.prop_string("name", &self.file_name);
        w.prop_f("level", self.level);
        w.prop_f("hasAlpha", if self.has_alpha { 1.0 } else { 0.0 });
        w.prop_int("coordinatesMode", self.coordinates_mode as i64);
        w.prop_f("uOffset", self.u_offset);
        w.prop_f("vOffset", self.v_offset);
        w.prop_f("uScale", self.u_scale);
        w.prop_f("vScale", self.v_scale);
        w.prop_f("uAng", self.u_ang);
        w.prop_f("vAng", self.v_ang);
        w.prop_f("wAng", self.w_ang);
        w.prop_int("wrapU", self.wrap_u as i64);
        w.prop_int("wrapV", self.wrap_v as i64);
        w.prop_int("coordinatesIndex", self.coordinates_index as i64);
        w.end_object();
    }
}

/// An exported standard material.
#[derive(Debug, Clone)]
pub struct ExportMaterial {
    /// Namespace-qualified id.
    pub name: String,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub emissive: [f32; 3],
    pub specular_power: f32,
    pub alpha: f32,
    pub backface_culling: bool,
    pub check_ready_only_once: bool,
    pub max_simultaneous_lights: u32,
    pub textures: Vec<ExportTexture>,
}

impl ExportMaterial {
    /// Convert a material definition for a mesh with the given UV sets.
    ///
    /// Texture slots are dropped with a warning when the mesh cannot map them:
    /// no UV set at all, or a second set requested that the mesh lacks. An
    /// opacity texture on a fully transparent material resets alpha to 1
    /// instead, matching how the runtime expects opacity to be expressed.
    pub fn build(
        def: &MaterialDef,
        default_namespace: &str,
        has_uv: bool,
        has_uv2: bool,
        store: &TextureStore,
        textures_out: &mut Vec<TextureOutput>,
        log: &mut ExportLog,
    ) -> Self {
        let namespace = def.namespace.as_deref().unwrap_or(default_namespace);
        log.log(2, &format!("processing begun of material:  {}", def.name));

        let mut material = Self {
            name: format!("{namespace}.{}", def.name),
            ambient: def.ambient,
            diffuse: def.diffuse,
            specular: def.specular,
            emissive: def.emissive,
            specular_power: def.specular_power,
            alpha: def.alpha,
            backface_culling: def.backface_culling,
            check_ready_only_once: def.check_ready_only_once,
            max_simultaneous_lights: def.max_simultaneous_lights,
            textures: Vec::new(),
        };

        for texture in &def.textures {
            if !has_uv {
                log.warn(3, &format!(
                    "Mesh has no UV maps, material texture:  \"{}\" ignored",
                    texture.file
                ));
                continue;
            }
            if texture.slot == TextureSlot::Opacity && material.alpha == 0.0 {
                log.warn(4, "Opacity non-std way to indicate opacity, use material alpha to also use Opacity texture");
                material.alpha = 1.0;
                continue;
            }
            if let Some(entry) = process_texture(texture, has_uv2, store, textures_out, log) {
                log.log(3, &format!("{} found \"{}\"", entry.field, entry.file_name));
                material.textures.push(entry);
            }
        }

        material
    }

    pub fn write(&self, w: &mut JsonWriter) {
        w.begin_object();
        w.prop_string("name", &self.name);
        w.prop_string("id", &self.name);
        w.prop_color("ambient", self.ambient);
        w.prop_color("diffuse", self.diffuse);
        w.prop_color("specular", self.specular);
        w.prop_color("emissive", self.emissive);
        w.prop_f("specularPower", self.specular_power);
        w.prop_f("alpha", self.alpha);
        w.prop_bool("backFaceCulling", self.backface_culling);
        w.prop_bool("checkReadyOnlyOnce", self.check_ready_only_once);
        w.prop_int("maxSimultaneousLights", self.max_simultaneous_lights as i64);
        for texture in &self.textures {
            texture.write(w);
        }
        w.end_object();
    }
}

/// A per-mesh material list, addressed by the mesh's sub-mesh material
/// indices.
#[derive(Debug, Clone)]
pub struct MultiMaterial {
    pub name: String,
    pub materials: Vec<String>,
}

impl MultiMaterial {
    pub fn new(materials: Vec<String>, index: usize, namespace: &str) -> Self {
        Self {
            name: format!("{namespace}.Multimaterial#{index}"),
            materials,
        }
    }

    pub fn write(&self, w: &mut JsonWriter) {
        w.begin_object();
        w.prop_string("name", &self.name);
        w.prop_string("id", &self.name);
        w.key("materials");
        w.begin_array();
        for name in &self.materials {
            w.value_string(name);
        }
        w.end_array();
        w.end_object();
    }
}

/// Read, convert, and stage one texture image; `None` drops the slot.
fn process_texture(
    def: &TextureDef,
    has_uv2: bool,
    store: &TextureStore,
    textures_out: &mut Vec<TextureOutput>,
    log: &mut ExportLog,
) -> Option<ExportTexture> {
    let bytes = match store.read(&def.file) {
        Ok(bytes) => bytes,
        Err(err) => {
            log.warn(3, &format!(
                "Error encountered processing image file:  {}, Error:  {err}",
                def.file
            ));
            return None;
        }
    };

    let base_name = file_base_name(&def.file);
    let (file_name, bytes, probed_alpha) = match image::guess_format(&bytes) {
        // web-native formats pass through untouched
        Ok(ImageFormat::Png) | Ok(ImageFormat::Jpeg) => {
            let alpha = match def.has_alpha {
                Some(alpha) => alpha,
                None => match image::load_from_memory(&bytes) {
                    Ok(img) => img.color().has_alpha(),
                    Err(_) => false,
                },
            };
            (base_name, bytes, alpha)
        }
        _ => {
            // content sniffing misses extensions like TGA, so fall back to the
            // file extension before giving up
            let decoded = image::load_from_memory(&bytes).or_else(|err| {
                def.file
                    .rsplit_once('.')
                    .and_then(|(_, ext)| ImageFormat::from_extension(ext))
                    .map(|format| image::load_from_memory_with_format(&bytes, format))
                    .unwrap_or(Err(err))
            });
            let img = match decoded {
                Ok(img) => img,
                Err(err) => {
                    log.warn(3, &format!(
                        "Error encountered processing image file:  {}, Error:  {err}",
                        def.file
                    ));
                    return None;
                }
            };
            let alpha = def.has_alpha.unwrap_or_else(|| img.color().has_alpha());
            let stem = base_name.rsplit_once('.').map_or(base_name.as_str(), |(s, _)| s);
            let png_name = format!("{stem}.png");
            let mut out = Vec::new();
            if let Err(err) = img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png) {
                log.warn(3, &format!(
                    "Error encountered processing image file:  {}, Error:  {err}",
                    def.file
                ));
                return None;
            }
            log.log(4, &format!("texture converted to PNG:  {png_name}"));
            (png_name, out, alpha)
        }
    };

    let mut coordinates_index = def.coordinates_index;
    if coordinates_index > 1 || (coordinates_index == 1 && !has_uv2) {
        log.warn(5, "Texture is not mapped as UV or UV2, assigned UV");
        coordinates_index = 0;
    }

    if !textures_out.iter().any(|t| t.file_name == file_name) {
        textures_out.push(TextureOutput {
            file_name: file_name.clone(),
            bytes,
        });
    }

    Some(ExportTexture {
        field: def.slot.field_name(),
        file_name,
        level: def.level,
        has_alpha: probed_alpha,
        coordinates_index,
        coordinates_mode: def.coordinates_mode.code(),
        u_offset: def.u_offset,
        v_offset: def.v_offset,
        u_scale: def.u_scale,
        v_scale: def.v_scale,
        u_ang: def.u_ang,
        v_ang: def.v_ang,
        w_ang: def.w_ang,
        wrap_u: def.wrap_u.code(),
        wrap_v: def.wrap_v.code(),
    })
}

/// Final path component, either separator convention.
fn file_base_name(path: &str) -> String {
    path.rsplit(['/', '\\']).next().unwrap_or(path).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{CoordinatesMode, WrapMode};
    use std::collections::HashMap;

    fn png_bytes(color: image::Rgba<u8>) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, color);
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn store_with(file: &str, bytes: Vec<u8>) -> TextureStore {
        let mut entries = HashMap::new();
        entries.insert(file.to_string(), bytes);
        TextureStore::Bundle(entries)
    }

    fn diffuse_def(file: &str) -> TextureDef {
        TextureDef {
            slot: TextureSlot::Diffuse,
            file: file.to_string(),
            level: 1.0,
            has_alpha: None,
            coordinates_index: 0,
            coordinates_mode: CoordinatesMode::Explicit,
            u_offset: 0.0,
            v_offset: 0.0,
            u_scale: 1.0,
            v_scale: 1.0,
            u_ang: 0.0,
            v_ang: 0.0,
            w_ang: 0.0,
            wrap_u: WrapMode::Wrap,
            wrap_v: WrapMode::Wrap,
        }
    }

    fn material_with(textures: Vec<TextureDef>) -> MaterialDef {
        let mut def: MaterialDef = serde_json::from_str(r#"{"name": "Brick"}"#).unwrap();
        def.textures = textures;
        def
    }

    #[test]
    fn test_namespaced_name() {
        let mat = ExportMaterial::build(
            &material_with(vec![]),
            "level_one",
            true,
            false,
            &TextureStore::Empty,
            &mut Vec::new(),
            &mut ExportLog::discard(),
        );
        assert_eq!(mat.name, "level_one.Brick");
    }

    #[test]
    fn test_texture_kept_and_staged() {
        let store = store_with("brick.png", png_bytes(image::Rgba([200, 90, 60, 255])));
        let mut staged = Vec::new();
        let mat = ExportMaterial::build(
            &material_with(vec![diffuse_def("brick.png")]),
            "ns",
            true,
            false,
            &store,
            &mut staged,
            &mut ExportLog::discard(),
        );
        assert_eq!(mat.textures.len(), 1);
        assert_eq!(mat.textures[0].field, "diffuseTexture");
        assert!(mat.textures[0].has_alpha); // RGBA source
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].file_name, "brick.png");
    }

    #[test]
    fn test_texture_dropped_without_uv() {
        let store = store_with("brick.png", png_bytes(image::Rgba([1, 2, 3, 255])));
        let mut log = ExportLog::discard();
        let mat = ExportMaterial::build(
            &material_with(vec![diffuse_def("brick.png")]),
            "ns",
            false,
            false,
            &store,
            &mut Vec::new(),
            &mut log,
        );
        assert!(mat.textures.is_empty());
        assert_eq!(log.warning_count(), 1);
    }

    #[test]
    fn test_missing_file_warns_and_drops() {
        let mut log = ExportLog::discard();
        let mat = ExportMaterial::build(
            &material_with(vec![diffuse_def("gone.png")]),
            "ns",
            true,
            false,
            &TextureStore::Empty,
            &mut Vec::new(),
            &mut log,
        );
        assert!(mat.textures.is_empty());
        assert_eq!(log.warning_count(), 1);
    }

    #[test]
    fn test_opacity_on_zero_alpha_resets_alpha() {
        let store = store_with("mask.png", png_bytes(image::Rgba([0, 0, 0, 128])));
        let mut def = material_with(vec![TextureDef {
            slot: TextureSlot::Opacity,
            ..diffuse_def("mask.png")
        }]);
        def.alpha = 0.0;

        let mut log = ExportLog::discard();
        let mat = ExportMaterial::build(
            &def,
            "ns",
            true,
            false,
            &store,
            &mut Vec::new(),
            &mut log,
        );
        assert!(mat.textures.is_empty());
        assert_eq!(mat.alpha, 1.0);
        assert_eq!(log.warning_count(), 1);
    }

    #[test]
    fn test_uv2_request_without_uv2_falls_back() {
        let store = store_with("brick.png", png_bytes(image::Rgba([1, 2, 3, 255])));
        let mut tex = diffuse_def("brick.png");
        tex.coordinates_index = 1;

        let mut log = ExportLog::discard();
        let mat = ExportMaterial::build(
            &material_with(vec![tex]),
            "ns",
            true,
            false,
            &store,
            &mut Vec::new(),
            &mut log,
        );
        assert_eq!(mat.textures[0].coordinates_index, 0);
        assert_eq!(log.warning_count(), 1);
    }

    #[test]
    fn test_non_web_format_converted_to_png() {
        // a TGA source must come out as PNG
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));
        let mut tga = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut tga), ImageFormat::Tga)
            .unwrap();

        let store = store_with("decal.tga", tga);
        let mut staged = Vec::new();
        let mat = ExportMaterial::build(
            &material_with(vec![diffuse_def("decal.tga")]),
            "ns",
            true,
            false,
            &store,
            &mut staged,
            &mut ExportLog::discard(),
        );
        assert_eq!(mat.textures[0].file_name, "decal.png");
        assert_eq!(staged[0].file_name, "decal.png");
        assert!(image::guess_format(&staged[0].bytes).unwrap() == ImageFormat::Png);
    }

    #[test]
    fn test_multi_material_name() {
        let mm = MultiMaterial::new(vec!["ns.A".into(), "ns.B".into()], 0, "ns");
        assert_eq!(mm.name, "ns.Multimaterial#0");
    }
}
