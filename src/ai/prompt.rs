//! Prompts and JSON response schemas for the three remote operations.

use serde_json::{json, Value};

const ANALYSIS_INSTRUCTION: &str = "\
You are a patient, encouraging American Sign Language tutor.
You will receive one camera frame of a student attempting a sign.

Rules:
1. Judge only the hand shape, orientation and position for the requested sign.
2. Set success to true only if a fluent signer would accept the sign.
3. message: one or two short sentences addressed to the student. When the
   attempt fails, name the single most important correction.
4. correctionPrompt: when the attempt fails, a prompt for an image model that
   shows the correct form. Omit it on success.
5. Reply with JSON only.";

const LESSON_INSTRUCTION: &str = "\
You design American Sign Language micro-lessons.
The student said something like \"teach me how to sign X\". Work out X and
describe one lesson for it.

Rules:
1. target: the English word, phrase or letter to sign, upper case.
2. description: one sentence describing how to form the sign.
3. difficulty: Beginner for single letters, Intermediate for single words,
   Conversational for phrases.
4. imagePrompt: a prompt for an image model showing a person making the sign
   against a plain background.
5. Reply with JSON only.";

/// Text part of the analysis request.
pub fn analysis_prompt(target: &str, spoken_question: Option<&str>) -> String {
    let mut prompt = String::with_capacity(ANALYSIS_INSTRUCTION.len() + 256);
    prompt.push_str(ANALYSIS_INSTRUCTION);
    prompt.push_str(&format!("\n\nThe student is signing: \"{target}\"."));
    if let Some(q) = spoken_question.map(str::trim).filter(|q| !q.is_empty()) {
        prompt.push_str(&format!(
            "\nThe student also asked aloud: \"{q}\". Answer the question in message."
        ));
    }
    prompt
}

/// Text part of the lesson-from-intent request.
pub fn lesson_prompt(free_text: &str) -> String {
    format!("{LESSON_INSTRUCTION}\n\nStudent said: \"{}\"", free_text.trim())
}

/// Response schema for hand-shape feedback.
pub fn feedback_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "success":          { "type": "BOOLEAN" },
            "message":          { "type": "STRING" },
            "correctionPrompt": { "type": "STRING" }
        },
        "required": ["success", "message"]
    })
}

/// Response schema for a generated lesson.
pub fn lesson_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "target":      { "type": "STRING" },
            "description": { "type": "STRING" },
            "difficulty":  { "type": "STRING", "enum": ["Beginner", "Intermediate", "Conversational"] },
            "imagePrompt": { "type": "STRING" }
        },
        "required": ["target", "description", "difficulty", "imagePrompt"]
    })
}
