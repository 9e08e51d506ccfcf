//! Default prompt templates for the three roles
//!
//! Templates use `{name}` placeholders filled by [`render`]. Role
//! constructors accept overrides, so hosts can tune wording without touching
//! the pipeline.

/// Appended to the base prompt after a malformed reply
pub const RETRY_SUFFIX: &str =
    "\n\nYou MUST respond with a single valid JSON object without extra text.";

pub const GENERATOR_PROMPT: &str = r#"You are the generator of an adaptive answering pipeline.
You are given a playbook of learned heuristics. Use the bullets that apply,
and cite the ids of every bullet you relied on.

Playbook:
{playbook}

Recent reflections from earlier samples:
{reflection}

Question:
{question}

Additional context:
{context}

Respond with a single JSON object:
{"reasoning": "<how you arrived at the answer>", "final_answer": "<the answer>", "bullet_ids": ["<ids of playbook bullets you used>"]}"#;

pub const REFLECTOR_PROMPT: &str = r#"You are the reflector of an adaptive answering pipeline.
Diagnose the generator's attempt against the feedback and ground truth below.
Identify what went wrong (or right), the root cause, and one transferable
insight. Tag each referenced playbook bullet as helpful, harmful, or neutral
for this outcome.

Question:
{question}

Generator reasoning:
{reasoning}

Generator answer:
{prediction}

Ground truth:
{ground_truth}

Environment feedback:
{feedback}

Referenced playbook bullets:
{playbook_excerpt}

Respond with a single JSON object:
{"reasoning": "...", "error_identification": "...", "root_cause_analysis": "...", "correct_approach": "...", "key_insight": "...", "bullet_tags": [{"id": "<bullet id>", "tag": "helpful|harmful|neutral"}]}"#;

pub const CURATOR_PROMPT: &str = r#"You are the curator of an adaptive answering pipeline.
Turn the reflection below into a small batch of playbook edits. Prefer
updating or tagging existing bullets over adding near-duplicates; remove
bullets that keep proving harmful. Keep each bullet short and actionable.

Progress: {progress}
Playbook stats: {stats}

Reflection:
{reflection}

Current playbook:
{playbook}

Sample under review:
{question_context}

Respond with a single JSON object:
{"reasoning": "<why these edits>", "operations": [{"type": "ADD|UPDATE|TAG|REMOVE", "section": "<section name>", "content": "<bullet text, for ADD/UPDATE>", "bullet_id": "<target id, for UPDATE/TAG/REMOVE>", "metadata": {"helpful": 1}}]}"#;

/// Substitute `{name}` placeholders. Unknown placeholders are left intact so
/// a template typo is visible in the rendered prompt rather than silently
/// swallowed.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (name, value) in vars {
        rendered = rendered.replace(&format!("{{{}}}", name), value);
    }
    rendered
}

/// Placeholder text for absent optional context
pub fn format_optional(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => "(none)",
    }
}
