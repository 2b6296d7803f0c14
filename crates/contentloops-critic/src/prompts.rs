use contentloops_writer::RunRequest;

use crate::CriteriaWeights;

/// Longest draft shown to the critic, in bytes
const MAX_CONTENT_LEN: usize = 8000;

/// Prompt templates for the critic
pub struct CriticPrompts;

impl CriticPrompts {
    /// Build the scoring prompt for one draft
    pub fn build_evaluation_prompt(
        content: &str,
        request: &RunRequest,
        weights: &CriteriaWeights,
    ) -> String {
        let focus = request
            .evaluation_focus()
            .map(|f| format!("\n## Evaluation Focus\nPay particular attention to: {}\n", f))
            .unwrap_or_default();

        format!(
            r#"You are a strict content reviewer. Score the social media post below.

## Original Request
{request}

## Expected Post
- Post type: {post_type} ({post_type_description})
- Language: {language}
- Target audience: {audience}
- Required hashtags: {hashtags}
{focus}
## Post To Evaluate
```
{content}
```

---

## Scoring Criteria

Score each criterion between 0.0 and 1.0, then combine them with these weights:
{criteria}

Rules:
- A post in the wrong language scores at most 0.3.
- Invented statistics, unsafe health claims or missing required hashtags lower quality_gate sharply.
- Feedback must be concrete: name the paragraph or sentence to change and how.

---

## Required Response Format

<thinking>
Your per-criterion assessment.
</thinking>
<result>
{{"score": 0.0, "feedback": "Specific, actionable revision instructions"}}
</result>

The score must be the weighted total, a number between 0.0 and 1.0."#,
            request = request.user_request(),
            post_type = request.post_type(),
            post_type_description = request.post_type().description(),
            language = request.language(),
            audience = request.target_audience().unwrap_or("general readers"),
            hashtags = if request.hashtags().is_empty() {
                "none specified".to_string()
            } else {
                request.hashtags().join(", ")
            },
            focus = focus,
            content = truncate_output(content, MAX_CONTENT_LEN),
            criteria = format_criteria(weights),
        )
    }
}

fn format_criteria(weights: &CriteriaWeights) -> String {
    weights
        .iter()
        .map(|(name, weight)| {
            format!(
                "- {} ({:.0}%): {}",
                name,
                weight * 100.0,
                CriteriaWeights::describe(name)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_output(output: &str, max_len: usize) -> &str {
    if output.len() <= max_len {
        return output;
    }
    let mut end = max_len;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    // Try to truncate at a line boundary
    match output[..end].rfind('\n') {
        Some(pos) => &output[..pos],
        None => &output[..end],
    }
}
