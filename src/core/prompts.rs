//! Prompt construction for the generation backends and assembly of the
//! compiled document.
//!
//! Prompts are plain instruction text; each builder takes exactly the
//! fields its stage has access to.

use crate::domain::ProcessPayload;

/// Instruction for the title-candidate generation call
pub fn title_prompt(payload: &ProcessPayload, count: usize) -> String {
    let mut prompt = format!(
        "Suggest {count} short, evocative titles for a {kind} prayer about \
         \"{topic}\" written in a {style} style. Write the titles in the \
         language with code '{language}'. Return one title per line, with \
         no numbering and no extra commentary.",
        count = count,
        kind = payload.prayer_kind,
        topic = payload.topic,
        style = payload.style,
        language = payload.language,
    );

    if let Some(ref notes) = payload.notes {
        prompt.push_str(&format!("\nAdditional guidance: {}", notes));
    }

    prompt
}

/// Instruction for the primary prayer text
pub fn content_prompt(payload: &ProcessPayload, title: &str) -> String {
    let mut prompt = format!(
        "Write a {kind} prayer titled \"{title}\" about \"{topic}\", in a \
         {style} style, suited to a \"{duration}\" duration. Write it \
         entirely in the language with code '{language}'. Return only the \
         prayer text.",
        kind = payload.prayer_kind,
        title = title,
        topic = payload.topic,
        style = payload.style,
        duration = payload.duration,
        language = payload.language,
    );

    if let Some(ref notes) = payload.notes {
        prompt.push_str(&format!("\nAdditional guidance: {}", notes));
    }

    prompt
}

/// Instruction for the condensed variant
pub fn short_prompt(payload: &ProcessPayload, content: &str) -> String {
    format!(
        "Condense the following prayer into a much shorter version that \
         keeps its voice and essential message, in the language with code \
         '{language}'. Return only the condensed prayer.\n\n{content}",
        language = payload.language,
        content = content,
    )
}

/// Regeneration instruction used after a language-gate failure
pub fn short_prompt_reinforced(payload: &ProcessPayload, content: &str) -> String {
    format!(
        "IMPORTANT: respond exclusively in the language with code \
         '{language}'; do not use any other language. Condense the \
         following prayer into a much shorter version that keeps its voice \
         and essential message. Return only the condensed prayer.\n\n{content}",
        language = payload.language,
        content = content,
    )
}

/// Instruction for the promotional description
pub fn description_prompt(payload: &ProcessPayload, title: &str, short: &str) -> String {
    format!(
        "Write a brief, inviting description for a published prayer titled \
         \"{title}\" about \"{topic}\". It should draw a reader in without \
         repeating the prayer verbatim. Use the language with code \
         '{language}'. Base it on this condensed version:\n\n{short}",
        title = title,
        topic = payload.topic,
        language = payload.language,
        short = short,
    )
}

/// Instruction asking the text backend for an image-generation prompt
pub fn image_prompt_request(payload: &ProcessPayload, title: &str, description: &str) -> String {
    format!(
        "Write a single-paragraph visual prompt for an image-generation \
         model: a serene cover illustration for a {kind} prayer titled \
         \"{title}\". Mood and subject should match this description: \
         {description}. Describe composition, lighting and palette; no text \
         in the image.",
        kind = payload.prayer_kind,
        title = title,
        description = description,
    )
}

/// Assemble the final markdown document from the accumulated pieces
pub fn compile_document(title: &str, content: &str, short: &str, description: &str) -> String {
    format!(
        "# {title}\n\n{description}\n\n## Prayer\n\n{content}\n\n## Condensed version\n\n{short}\n",
        title = title,
        description = description,
        content = content,
        short = short,
    )
}

/// Parse title candidates out of a raw completion: one per line, list
/// markers and surrounding quotes stripped, empties dropped.
pub fn parse_titles(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')')
                .trim_start_matches(&['-', '*', '•'][..])
                .trim()
                .trim_matches('"')
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}
