//! Two-signature failure classification used in restrictive mode.

use serde::Serialize;

/// Signature of a Python module missing from the packaged app.
pub const MISSING_MODULE_SIGNATURE: &str = "no module named";
/// Signature of a missing or mismatched Android NDK.
pub const NDK_SIGNATURE: &str = "ndk";

/// Known failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    MissingModule,
    NdkToolchain,
    Undetermined,
}

impl FailureClass {
    pub fn label(self) -> &'static str {
        match self {
            FailureClass::MissingModule => "missing python module",
            FailureClass::NdkToolchain => "android ndk toolchain",
            FailureClass::Undetermined => "undetermined (need more evidence)",
        }
    }

    fn directive(self) -> &'static str {
        match self {
            FailureClass::MissingModule => {
                "Add the missing module to the requirements line of buildozer.spec and rebuild. \
                 Clean the dist first if it still fails."
            }
            FailureClass::NdkToolchain => {
                "Set android.ndk in buildozer.spec to the version p4a expects and rebuild. \
                 Then check the SDK path."
            }
            FailureClass::Undetermined => {
                "Paste the last 30 lines of the build log so the failure can be classified. \
                 Include the first error line."
            }
        }
    }
}

/// Classification plus its single directive sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub class: FailureClass,
    pub directive: String,
}

impl Classification {
    /// Two-line rendering: the class label, then exactly one bullet directive.
    pub fn render(&self) -> String {
        format!(
            "classification: {}\n- {}",
            self.class.label(),
            self.directive
        )
    }
}

/// Classify `input` by signature substring (case-insensitive).
///
/// The missing-module signature is checked first, so an input carrying both
/// signatures is classified as a missing module.
pub fn classify(input: &str) -> Classification {
    let lowered = input.to_lowercase();
    let class = if lowered.contains(MISSING_MODULE_SIGNATURE) {
        FailureClass::MissingModule
    } else if lowered.contains(NDK_SIGNATURE) {
        FailureClass::NdkToolchain
    } else {
        FailureClass::Undetermined
    };
    Classification {
        class,
        directive: first_clause(class.directive()),
    }
}

/// Keep only the first sentence of `text`, terminated with a period.
///
/// ASCII terminators (`.`, `!`, `?`, `;`) end a sentence only when followed by
/// whitespace or the end of text, so `buildozer.spec` stays intact. Newlines
/// and full-width terminators always end a sentence.
pub fn first_clause(text: &str) -> String {
    let mut rest = text;
    loop {
        let (clause, tail) = match sentence_end(rest) {
            Some(idx) => {
                let width = rest[idx..].chars().next().map_or(1, char::len_utf8);
                (&rest[..idx], &rest[idx + width..])
            }
            None => (rest, ""),
        };
        let clause = clause.trim();
        if !clause.is_empty() {
            return format!("{clause}.");
        }
        if tail.is_empty() {
            return String::new();
        }
        rest = tail;
    }
}

fn sentence_end(text: &str) -> Option<usize> {
    let mut chars = text.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        let boundary = match ch {
            '\n' | '。' | '！' | '？' | '；' => true,
            '.' | '!' | '?' | ';' => chars.peek().is_none_or(|(_, next)| next.is_whitespace()),
            _ => false,
        };
        if boundary {
            return Some(idx);
        }
    }
    None
}
