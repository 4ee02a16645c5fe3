//! Planner prompts

use crate::llm::Message;
use sdk::{ImageProfile, Modality, OpSpec};
use serde::Serialize;
use serde_json::json;

const TABULAR_SYSTEM: &str = "You are a data-cleaning planner for tabular data. Return JSON ONLY. NO MARKDOWN.\n\
Shape: {\"ops\":[...],\"notes\":\"...\"}\n\
Available ops:\n\
- {\"op\":\"drop_cols\",\"cols\":[\"a\"]}\n\
- {\"op\":\"cast\",\"col\":\"a\",\"to\":\"int|float|bool|datetime|string\"}\n\
- {\"op\":\"impute\",\"col\":\"a\",\"strategy\":\"median|mean|constant\",\"value\":0}\n\
- {\"op\":\"trim_whitespace\",\"cols\":[\"a\"]}\n\
- {\"op\":\"parse_dates\",\"col\":\"a\"}\n\
- {\"op\":\"scale\",\"cols\":[\"a\"],\"method\":\"standard|minmax|log1p\",\"inplace\":false}\n\
- {\"op\":\"outliers\",\"cols\":[\"a\"],\"method\":\"zscore|iqr\",\"threshold\":3,\"action\":\"cap|remove|flag\"}";

const TEXT_SYSTEM: &str = "You are a text-cleaning planner. Return JSON ONLY. NO MARKDOWN.\n\
Shape: {\"ops\":[...],\"notes\":\"...\"}\n\
Available ops: remove_boilerplate, lowercase, remove_punctuation, \
remove_stopwords (with \"language\"), normalize_whitespace, tokenize, lemmatize.\n\
Each op is an object such as {\"op\":\"lowercase\"}.";

const IMAGE_SYSTEM: &str = "You are an expert image preprocessing planner. Analyze the image profile and user goal to create an optimal preprocessing plan.\n\
Available preprocessing operations:\n\
- Resize: standardize dimensions ({\"op\":\"resize\",\"width\":224,\"height\":224})\n\
- Denoise: reduce noise ({\"op\":\"denoise\",\"method\":\"gaussian|median|bilateral\",\"ksize\":5})\n\
- Normalize: scale pixel values ({\"op\":\"normalize\",\"method\":\"minmax|zscore\"})\n\
- Augment, deterministic: exact transforms ({\"op\":\"augment\",\"mode\":\"deterministic\",\"rotation\":15,\"zoom\":1.1,\"h_flip\":true})\n\
- Augment, ml_training: random variants ({\"op\":\"augment\",\"mode\":\"ml_training\",\"rotation_range\":30,\"zoom_range\":0.2,\"horizontal_flip\":true,\"num_variants\":8})\n\
For ml_training augmentation recommend 1-20 variants.\n\
Return only valid JSON with \"ops\" (list of ops), \"reasoning\" (why you chose them) and \"notes\" (brief strategy).\n\
NO MARKDOWN. ONLY JSON.";

const EXPLAIN_SYSTEM: &str = "You are a fair AI instructor explaining one image preprocessing step to a user. \
Cover: 1) what it does 2) a critical consideration 3) its impact on ML training. Plain text, a few sentences.";

fn system_prompt(modality: Modality) -> &'static str {
    match modality {
        Modality::Tabular => TABULAR_SYSTEM,
        Modality::Text => TEXT_SYSTEM,
        Modality::Image => IMAGE_SYSTEM,
    }
}

/// System prompt plus `{"user_goal", "profile"}` as the user message
pub fn plan_messages<P: Serialize>(modality: Modality, profile: &P, goal: &str) -> Vec<Message> {
    let payload = json!({
        "user_goal": goal,
        "profile": profile,
    });
    vec![
        Message::system(system_prompt(modality)),
        Message::user(payload.to_string()),
    ]
}

pub fn explain_messages(step: &OpSpec, profile: &ImageProfile, goal: &str) -> Vec<Message> {
    let payload = json!({
        "goal": goal,
        "image_profile": profile,
        "step": step,
    });
    vec![
        Message::system(EXPLAIN_SYSTEM),
        Message::user(payload.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;
    use sdk::TextProfile;

    #[test]
    fn test_plan_messages_embed_goal_and_profile() {
        let profile = TextProfile {
            chars: 12,
            language: "en".to_string(),
            ..Default::default()
        };
        let messages = plan_messages(Modality::Text, &profile, "prepare for NLP");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[0].content.contains("remove_stopwords"));

        let body: serde_json::Value = serde_json::from_str(&messages[1].content).unwrap();
        assert_eq!(body["user_goal"], "prepare for NLP");
        assert_eq!(body["profile"]["chars"], 12);
    }

    #[test]
    fn test_each_modality_has_its_vocabulary() {
        assert!(system_prompt(Modality::Tabular).contains("outliers"));
        assert!(system_prompt(Modality::Image).contains("num_variants"));
    }
}
