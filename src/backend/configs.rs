use crate::protocol::enums::{
    EGL_ALPHA_SIZE, EGL_BLUE_SIZE, EGL_BUFFER_SIZE, EGL_CONFIG_CAVEAT, EGL_CONFIG_ID,
    EGL_DEPTH_SIZE, EGL_DONT_CARE, EGL_GREEN_SIZE, EGL_NONE, EGL_OPENGL_ES_BIT,
    EGL_OPENGL_ES2_BIT, EGL_PBUFFER_BIT, EGL_RED_SIZE, EGL_RENDERABLE_TYPE, EGL_SAMPLE_BUFFERS,
    EGL_SAMPLES, EGL_STENCIL_SIZE, EGL_SURFACE_TYPE, EGL_WINDOW_BIT,
};

/// Attribute columns of the packed configuration table, in wire order.
pub const CONFIG_ATTRIBUTES: [i32; 13] = [
    EGL_DEPTH_SIZE,
    EGL_STENCIL_SIZE,
    EGL_RENDERABLE_TYPE,
    EGL_SURFACE_TYPE,
    EGL_CONFIG_ID,
    EGL_BUFFER_SIZE,
    EGL_ALPHA_SIZE,
    EGL_BLUE_SIZE,
    EGL_GREEN_SIZE,
    EGL_RED_SIZE,
    EGL_CONFIG_CAVEAT,
    EGL_SAMPLES,
    EGL_SAMPLE_BUFFERS,
];

const EGL_NONE_CAVEAT: i32 = EGL_NONE;

/// One framebuffer configuration as exposed to the guest.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FbConfig {
    /// Red channel bits.
    pub red: i32,
    /// Green channel bits.
    pub green: i32,
    /// Blue channel bits.
    pub blue: i32,
    /// Alpha channel bits.
    pub alpha: i32,
    /// Depth buffer bits.
    #[serde(default)]
    pub depth: i32,
    /// Stencil buffer bits.
    #[serde(default)]
    pub stencil: i32,
    /// Multisample count, `0` for none.
    #[serde(default)]
    pub samples: i32,
    /// `EGL_SURFACE_TYPE` bitmask.
    #[serde(default = "default_surface_type")]
    pub surface_type: i32,
    /// `EGL_RENDERABLE_TYPE` bitmask.
    #[serde(default = "default_renderable_type")]
    pub renderable_type: i32,
}

fn default_surface_type() -> i32 {
    EGL_WINDOW_BIT | EGL_PBUFFER_BIT
}

fn default_renderable_type() -> i32 {
    EGL_OPENGL_ES_BIT | EGL_OPENGL_ES2_BIT
}

impl FbConfig {
    /// 8-bit RGBA with the given depth and stencil sizes.
    pub fn rgba8888(depth: i32, stencil: i32) -> Self {
        Self {
            red: 8,
            green: 8,
            blue: 8,
            alpha: 8,
            depth,
            stencil,
            samples: 0,
            surface_type: default_surface_type(),
            renderable_type: default_renderable_type(),
        }
    }

    /// 16-bit RGB without alpha, depth or stencil.
    pub fn rgb565() -> Self {
        Self {
            red: 5,
            green: 6,
            blue: 5,
            alpha: 0,
            depth: 0,
            stencil: 0,
            samples: 0,
            surface_type: default_surface_type(),
            renderable_type: default_renderable_type(),
        }
    }

    /// Value of `attr` for this config when it sits at index `id`.
    pub fn attribute(&self, attr: i32, id: u32) -> Option<i32> {
        let v = match attr {
            EGL_DEPTH_SIZE => self.depth,
            EGL_STENCIL_SIZE => self.stencil,
            EGL_RENDERABLE_TYPE => self.renderable_type,
            EGL_SURFACE_TYPE => self.surface_type,
            EGL_CONFIG_ID => i32::try_from(id).ok()?,
            EGL_BUFFER_SIZE => self.red + self.green + self.blue + self.alpha,
            EGL_ALPHA_SIZE => self.alpha,
            EGL_BLUE_SIZE => self.blue,
            EGL_GREEN_SIZE => self.green,
            EGL_RED_SIZE => self.red,
            EGL_CONFIG_CAVEAT => EGL_NONE_CAVEAT,
            EGL_SAMPLES => self.samples,
            EGL_SAMPLE_BUFFERS => i32::from(self.samples > 0),
            _ => return None,
        };
        Some(v)
    }

    /// Whether this config satisfies an `EGL_NONE`-terminated attribute list.
    ///
    /// Size attributes are minimums, bitmask attributes must all be present,
    /// everything else must match exactly. Unknown attributes never match.
    pub fn satisfies(&self, id: u32, attribs: &[i32]) -> bool {
        for pair in attribs.chunks(2) {
            let attr = pair[0];
            if attr == EGL_NONE {
                break;
            }
            let Some(&want) = pair.get(1) else {
                return false;
            };
            if want == EGL_DONT_CARE {
                continue;
            }
            let Some(have) = self.attribute(attr, id) else {
                return false;
            };
            let ok = match attr {
                EGL_SURFACE_TYPE | EGL_RENDERABLE_TYPE => have & want == want,
                EGL_CONFIG_ID | EGL_CONFIG_CAVEAT => have == want,
                _ => have >= want,
            };
            if !ok {
                return false;
            }
        }
        true
    }
}

/// The backend's enumerated framebuffer configurations. A config is named on
/// the wire by its index in this table (its `EGL_CONFIG_ID`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigTable {
    configs: Vec<FbConfig>,
}

impl ConfigTable {
    /// Table over `configs`, indexed in order.
    pub fn new(configs: Vec<FbConfig>) -> Self {
        Self { configs }
    }

    /// Number of configs.
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    /// Whether the table has no configs.
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Config with index `id`.
    pub fn get(&self, id: u32) -> Option<&FbConfig> {
        self.configs.get(id as usize)
    }

    /// Configs paired with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &FbConfig)> {
        (0u32..).zip(self.configs.iter())
    }

    /// `(config count, attributes per config)`.
    pub fn pack_info(&self) -> (u32, u32) {
        let count = u32::try_from(self.configs.len()).unwrap_or(u32::MAX);
        (count, CONFIG_ATTRIBUTES.len() as u32)
    }

    /// Header row of attribute ids followed by one row per config.
    pub fn pack(&self) -> Vec<u32> {
        let mut out = Vec::with_capacity((self.configs.len() + 1) * CONFIG_ATTRIBUTES.len());
        out.extend(CONFIG_ATTRIBUTES.iter().map(|&a| a as u32));
        for (id, cfg) in self.iter() {
            out.extend(
                CONFIG_ATTRIBUTES
                    .iter()
                    .map(|&a| cfg.attribute(a, id).unwrap_or(0) as u32),
            );
        }
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/backend/configs.rs"]
mod tests;
