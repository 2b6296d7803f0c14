use crate::{Language, PlanOutput, PostType, RunRequest, Topic};

/// Prompt templates for the plan and generate stages
pub struct WriterPrompts;

impl WriterPrompts {
    /// Build the planning prompt
    pub fn build_plan_prompt(request: &RunRequest, context: &[String]) -> String {
        format!(
            r#"You are the planning agent of a content team. Draft a plan for one social media post.

## User Request
{user_request}

## Settings
- Language: {language}
- Topic: {topic} ({topic_description})
- Target audience: {audience}
- Hashtags to include: {hashtags}

## Topic Guidance
{topic_guidance}

## Reference Material
{context}

---

## Required Response Format

First reason step by step inside a thinking block:
<thinking>
(1) What is the user asking for and who will read it?
(2) Which facts from the reference material are reliable and relevant?
(3) What structure, tone and call to action fit the topic?
</thinking>

Then write the plan as numbered sections: LANGUAGE, MAIN TOPIC, TARGET AUDIENCE, MESSAGE OBJECTIVE, KEY POINTS, STRUCTURE, TONE, HASHTAGS.
Write the plan in {language_name}."#,
            user_request = request.user_request(),
            language = request.language(),
            topic = request.topic(),
            topic_description = request.topic().description(),
            audience = request.target_audience().unwrap_or("general readers"),
            hashtags = format_hashtags(request.hashtags()),
            topic_guidance = topic_guidance(request.topic()),
            context = format_context(context),
            language_name = language_name(request.language()),
        )
    }

    /// Build the generation prompt for one iteration
    pub fn build_generation_prompt(
        request: &RunRequest,
        plan: &PlanOutput,
        feedback: &str,
        context: &[String],
    ) -> String {
        let feedback_section = if feedback.trim().is_empty() {
            "This is the first draft.".to_string()
        } else {
            format!(
                "A reviewer scored the previous draft and left this feedback. Address every point:\n{}",
                feedback.trim()
            )
        };

        format!(
            r#"You are the writing agent of a content team. Write one complete social media post.

## User Request
{user_request}

## Plan
{plan}

## Post Type
{post_type}: {post_type_description}

## Settings
- Language: {language}
- Target audience: {audience}
- Hashtags to include: {hashtags}

## Reference Material
{context}

## Feedback
{feedback}

---

## Rules
- Follow the plan's structure and tone.
- Only use facts you can support from the reference material or common knowledge; keep placeholders in [square brackets] for missing figures.
- End the post with the hashtags.
- Do not explain your edits.

## Required Response Format
<thinking>
Your reasoning about structure, facts and how the feedback is applied.
</thinking>
<content>
The full post, written in {language_name}.
</content>
CONTENT_END"#,
            user_request = request.user_request(),
            plan = plan.plan,
            post_type = request.post_type(),
            post_type_description = request.post_type().description(),
            language = request.language(),
            audience = request.target_audience().unwrap_or("general readers"),
            hashtags = format_hashtags(request.hashtags()),
            context = format_context(context),
            feedback = feedback_section,
            language_name = language_name(request.language()),
        )
    }

    /// Deterministic plan used when the backend could not produce one
    pub fn build_fallback_plan(request: &RunRequest) -> String {
        let mut plan = format!(
            "1. LANGUAGE: {}\n2. MAIN TOPIC: {}\n3. TARGET AUDIENCE: {}\n4. MESSAGE OBJECTIVE: Answer the request \"{}\"\n5. STRUCTURE: hook, {} key points, call to action",
            request.language(),
            request.topic().description(),
            request.target_audience().unwrap_or("general readers"),
            request.user_request().trim(),
            key_point_count(request.post_type()),
        );
        if !request.hashtags().is_empty() {
            plan.push_str(&format!("\n6. HASHTAGS: {}", format_hashtags(request.hashtags())));
        }
        plan
    }
}

fn language_name(language: Language) -> &'static str {
    match language {
        Language::Vietnamese => "Vietnamese",
        Language::English => "English",
    }
}

fn topic_guidance(topic: Topic) -> &'static str {
    match topic {
        Topic::FoodNutrition => {
            "Give concrete nutritional facts (amounts, frequencies) and a practical tip readers can apply today."
        }
        Topic::DiseaseWarning => {
            "List warning signs clearly, avoid alarmism, and always recommend seeing a doctor."
        }
        Topic::TravelAdventure => {
            "Paint the destination vividly and include safety and preparation advice."
        }
        Topic::BusinessEnterprise => {
            "Speak to decision makers: quantify benefits and keep the tone professional."
        }
        Topic::LifestyleOffice => {
            "Focus on small habits office workers can adopt during a working day."
        }
        Topic::HolidayEvent => {
            "Tie the message to the occasion and keep the tone warm and celebratory."
        }
    }
}

fn key_point_count(post_type: PostType) -> usize {
    match post_type {
        PostType::DiseaseWarning => 5,
        PostType::BusinessEnterprise => 3,
        _ => 4,
    }
}

fn format_hashtags(hashtags: &[String]) -> String {
    if hashtags.is_empty() {
        "choose 3-5 relevant hashtags".to_string()
    } else {
        hashtags
            .iter()
            .map(|h| {
                let h = h.trim();
                if h.starts_with('#') {
                    h.to_string()
                } else {
                    format!("#{}", h)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn format_context(context: &[String]) -> String {
    if context.is_empty() {
        return "None available.".to_string();
    }
    context
        .iter()
        .enumerate()
        .map(|(i, snippet)| format!("{}. {}", i + 1, snippet))
        .collect::<Vec<_>>()
        .join("\n")
}
