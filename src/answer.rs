pub const EXPLANATION_MARKER: &str = "****What to Say:****";
pub const CODE_MARKER: &str = "****Code:****";

/// An answer split into a prose part and a code part for two-column display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitAnswer {
    pub explanation: String,
    pub code: String,
}

/// Split on the explanation/code markers. Without markers the whole answer
/// is treated as code.
pub fn split_answer(answer: &str) -> SplitAnswer {
    let explanation_at = answer.find(EXPLANATION_MARKER);
    let code_at = answer.find(CODE_MARKER);

    let (explanation, code) = match (explanation_at, code_at) {
        (Some(e), Some(c)) if e < c => (
            &answer[e + EXPLANATION_MARKER.len()..c],
            &answer[c + CODE_MARKER.len()..],
        ),
        (Some(e), _) => (&answer[e + EXPLANATION_MARKER.len()..], ""),
        (None, Some(c)) => ("", &answer[c + CODE_MARKER.len()..]),
        (None, None) => ("", answer),
    };

    SplitAnswer {
        explanation: explanation.trim().to_string(),
        code: code.trim().to_string(),
    }
}

/// Markdown shown in the code column. Answers that already carry a fenced
/// block are shown as-is.
pub fn code_markdown(code: &str) -> String {
    if code.trim_start().starts_with("```") {
        code.to_string()
    } else {
        format!("```\n{code}\n```")
    }
}
