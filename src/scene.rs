//! Scene Catalog
//!
//! Static mapping from a scene identifier to the setting injected into the
//! generation prompt. Resolution is total over its input space: unknown
//! identifiers and blank custom text fall back to the default scene, so a
//! resolved setting always carries non-empty fields.

use serde::{Deserialize, Serialize};

/// Identifier of the fallback scene.
pub const DEFAULT_SCENE: &str = "default";

/// Thematic backdrop that flavors a generated mnemonic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneSetting {
    /// Worldview the model must stay inside, verbatim in the prompt.
    pub background: String,
    /// Instruction describing how the scene frames the word.
    pub description: String,
}

/// Resolve a scene identifier to its setting.
///
/// `custom` is parameterized by `custom_text`; when that text is absent or
/// blank the resolver falls back to the default scene rather than produce
/// an empty setting.
pub fn resolve(scene_id: &str, custom_text: Option<&str>) -> SceneSetting {
    match scene_id {
        "harrypotter" => SceneSetting {
            background: "哈利波特魔法世界".to_string(),
            description: "在霍格沃茨魔法学校或魔法世界中展现该单词的含义".to_string(),
        },
        "zhenhuanchuan" => SceneSetting {
            background: "甄嬛传宫廷".to_string(),
            description: "在清朝宫廷中展现该单词的含义".to_string(),
        },
        "custom" => match custom_text.map(str::trim).filter(|text| !text.is_empty()) {
            Some(text) => SceneSetting {
                background: text.to_string(),
                description: format!("在{}中展现该单词的含义", text),
            },
            None => default_setting(),
        },
        _ => default_setting(),
    }
}

/// Scene identifiers with a fixed catalog entry.
pub fn known_scenes() -> &'static [&'static str] {
    &["default", "harrypotter", "zhenhuanchuan", "custom"]
}

fn default_setting() -> SceneSetting {
    SceneSetting {
        background: "现代日常生活".to_string(),
        description: "在日常生活场景中描述该单词的含义和用法".to_string(),
    }
}
