//! Keyword-hit scoring of build logs against a fixed stage taxonomy.
//!
//! Every keyword hit counts as one point regardless of how specific the
//! keyword is. Ties keep taxonomy order.

use serde::Serialize;

/// Maximum number of candidates returned by [`locate`].
pub const MAX_CANDIDATES: usize = 3;

/// One phase of the build/run pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stage {
    pub id: &'static str,
    /// Lowercase substrings; matched by containment, not by token.
    pub keywords: &'static [&'static str],
    pub meaning: &'static str,
}

/// Fixed taxonomy, in pipeline order.
pub const STAGES: &[Stage] = &[
    Stage {
        id: "spec",
        keywords: &["buildozer.spec", "spec file", "configparser", "no section", "[app]"],
        meaning: "buildozer.spec parsing: the project configuration could not be read",
    },
    Stage {
        id: "toolchain",
        keywords: &[
            "sdk",
            "ndk",
            "sdkmanager",
            "platform-tools",
            "build-tools",
            "license",
            "android api",
        ],
        meaning: "Android SDK/NDK toolchain setup: a required SDK, NDK or licence is missing",
    },
    Stage {
        id: "fetch",
        keywords: &[
            "download",
            "urlopen",
            "connection refused",
            "timed out",
            "pip install",
            "could not resolve",
            "ssl",
        ],
        meaning: "dependency download: a source archive or package could not be fetched",
    },
    Stage {
        id: "cook",
        keywords: &[
            "recipe",
            "p4a",
            "python-for-android",
            "cython",
            "hostpython",
            "distribution",
        ],
        meaning: "recipe build (p4a cook): a python-for-android recipe failed to build",
    },
    Stage {
        id: "compile",
        keywords: &[
            "build failed",
            "undefined reference",
            "clang",
            "gcc",
            "ld returned",
            "linker",
            "compilation terminated",
            "cmake",
        ],
        meaning: "native compile/link: C or C++ sources failed to compile or link",
    },
    Stage {
        id: "package",
        keywords: &["gradle", "apk", "aab", "androidmanifest", "dex", "aapt"],
        meaning: "gradle packaging: the APK/AAB could not be assembled",
    },
    Stage {
        id: "deploy",
        keywords: &["adb", "install_failed", "keystore", "jarsigner", "signing", "no devices"],
        meaning: "signing and install: the package could not be signed or installed on a device",
    },
    Stage {
        id: "runtime",
        keywords: &[
            "traceback",
            "no module named",
            "importerror",
            "fatal signal",
            "logcat",
            "crash",
        ],
        meaning: "runtime: the app was installed but crashed while starting or running",
    },
];

/// Score of one stage against a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageMatch {
    pub stage_id: &'static str,
    pub score: usize,
    pub meaning: &'static str,
    pub matched_keywords: Vec<&'static str>,
}

/// Ranked result of [`locate`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StageReport {
    /// Up to [`MAX_CANDIDATES`] non-zero matches, best first.
    pub candidates: Vec<StageMatch>,
}

impl StageReport {
    /// Highest-scoring stage, or `None` when nothing matched.
    pub fn best(&self) -> Option<&StageMatch> {
        self.candidates.first()
    }
}

/// Score `log` against [`STAGES`].
pub fn locate(log: &str) -> StageReport {
    locate_in(STAGES, log)
}

/// Score `log` against an arbitrary taxonomy.
pub fn locate_in(stages: &[Stage], log: &str) -> StageReport {
    let haystack = log.to_lowercase();
    let mut matches: Vec<StageMatch> = stages
        .iter()
        .filter_map(|stage| {
            let matched_keywords: Vec<&'static str> = stage
                .keywords
                .iter()
                .copied()
                .filter(|keyword| haystack.contains(keyword))
                .collect();
            if matched_keywords.is_empty() {
                return None;
            }
            Some(StageMatch {
                stage_id: stage.id,
                score: matched_keywords.len(),
                meaning: stage.meaning,
                matched_keywords,
            })
        })
        .collect();
    // Stable sort: equal scores stay in taxonomy order.
    matches.sort_by(|a, b| b.score.cmp(&a.score));
    matches.truncate(MAX_CANDIDATES);
    StageReport {
        candidates: matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(report: &StageReport) -> Vec<&'static str> {
        report.candidates.iter().map(|m| m.stage_id).collect()
    }

    #[test]
    fn empty_log_has_no_best() {
        let report = locate("");
        assert!(report.best().is_none());
        assert!(report.candidates.is_empty());
    }

    #[test]
    fn unrelated_log_has_no_best() {
        assert!(locate("everything is fine").best().is_none());
    }

    #[test]
    fn ndk_gradle_example_breaks_ties_by_taxonomy_order() {
        let report = locate("Could not find NDK gradle BUILD FAILED");
        assert_eq!(ids(&report), vec!["toolchain", "compile", "package"]);
        let best = report.best().expect("best");
        assert_eq!(best.matched_keywords, vec!["ndk"]);
        assert_eq!(best.score, 1);
    }

    #[test]
    fn higher_score_beats_taxonomy_order() {
        let report = locate("clang: error\nundefined reference to `main`\nndk r25");
        let best = report.best().expect("best");
        assert_eq!(best.stage_id, "compile");
        assert_eq!(best.score, 2);
        assert_eq!(best.matched_keywords, vec!["undefined reference", "clang"]);
    }

    #[test]
    fn keyword_inside_longer_token_counts() {
        let report = locate("ANDROID_SDK_ROOT unset");
        assert_eq!(ids(&report), vec!["toolchain"]);
    }

    #[test]
    fn candidates_are_capped() {
        let report = locate("buildozer.spec sdk download recipe gcc gradle adb traceback");
        assert_eq!(report.candidates.len(), MAX_CANDIDATES);
        assert_eq!(ids(&report), vec!["spec", "toolchain", "fetch"]);
    }

    #[test]
    fn locate_is_deterministic() {
        let log = "p4a recipe hostpython failed\nld returned 1 exit status\ngradle";
        assert_eq!(locate(log), locate(log));
    }

    #[test]
    fn custom_taxonomy_is_supported() {
        const TINY: &[Stage] = &[Stage {
            id: "only",
            keywords: &["boom"],
            meaning: "test stage",
        }];
        let report = locate_in(TINY, "BOOM");
        assert_eq!(ids(&report), vec!["only"]);
    }
}
