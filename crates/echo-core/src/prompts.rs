//! Daily journaling prompts shown as placeholder text on the capture screen.

use rand::seq::SliceRandom;

pub const JOURNAL_PROMPTS: &[&str] = &[
    "Type here or 🎙️. Spill your tea",
    "What made you smile today? 😊",
    "Unexpected moments and your reactions today? 🔄",
    "Any small victories or accomplishments today? 🏆",
    "How did you relax or unwind today? 🛀",
    "What challenges did you face today? 🚧",
    "Memorable conversations or interactions from today? 💬",
    "Witnessed or experienced kindness today? 🌟",
    "What were you grateful for today? 🙏",
    "Any new discoveries or learnings today? 📚",
    "Impactful decisions made today? 🤔",
];

/// One prompt, chosen uniformly at random.
pub fn random_prompt() -> &'static str {
    JOURNAL_PROMPTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(JOURNAL_PROMPTS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_prompt_comes_from_list() {
        for _ in 0..50 {
            assert!(JOURNAL_PROMPTS.contains(&random_prompt()));
        }
    }
}
