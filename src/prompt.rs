//! Prompt Composer
//!
//! Renders the fixed instruction template sent to the chat endpoint. The
//! template pins the output contract the extractor depends on: a single
//! JSON object with exactly four string fields and nothing else, a simple
//! phonetic/morphological keyword breakdown, the word's meaning embedded
//! in the image description (bold or bracketed) instead of stated as a
//! translation, and the resolved scene strings reproduced verbatim so the
//! model cannot invent its own setting.

use crate::scene::SceneSetting;

/// Instruction template. `{word}` is interpolated once, `{description}`
/// once and `{background}` twice (worked example plus format block).
const PROMPT_TEMPLATE: &str = r#"# Role
Create memory aids based on user input English words.
--------------
# Object
Requirements: Provide keywords and visual memory aids, but do not directly state the Chinese meaning. Instead, incorporate the meaning into the memory aids.
--------------
# Rules
Conditions:
1) The broken-down keywords must be simple and meaningful
2) Image descriptions must be reasonable, logical, engaging and have contrast
3) The word's [Chinese meaning] must be marked in bold or enclosed in parentheses ( such as **justice** )
4) Must strictly follow the JSON format below, with no other content
5) Do not output any other content, do not output any other content, do not output any other content
6) Use emojis appropriately to add fun
7) For words with multiple meanings (e.g. noun vs verb), describe comprehensively based on context
8) Must strictly follow the given scene's worldview, no creating or modifying scene settings
--------------
# Example

{
    "英语": "justice",
    "关键词": "just（只）+ice（冰）",
    "世界观": "{background}",
    "图像描述": "一个小孩跟妈妈抱怨被别的孩子打了。作为安慰，他只得到了一个冰激凌，但也算是**公平**地解决了"
}
--------------
# Format
{
    "英语": "{word}",
    "关键词": "拆解的关键词",
    "世界观": "{background}",
    "图像描述": "{description}"
}"#;

/// Render the instruction template for one word and resolved scene.
///
/// Pure string templating; never fails.
pub fn compose(word: &str, setting: &SceneSetting) -> String {
    PROMPT_TEMPLATE
        .replace("{word}", word)
        .replace("{background}", &setting.background)
        .replace("{description}", &setting.description)
}
