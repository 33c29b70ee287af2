use crate::models::pattern::{PatternDefinition, PatternFocus};

pub static PATTERN_DEFINITIONS: &[PatternDefinition] = &[
    PatternDefinition {
        pattern_id: "time-adverb",
        label: "시간 부사",
        description: "시간 부사의 위치(문장 끝/시작)에 익숙해지기",
        focus: PatternFocus::TimeAdverb,
        example: "I met a friend yesterday.",
    },
    PatternDefinition {
        pattern_id: "frequency-adverb",
        label: "빈도 부사",
        description: "빈도 부사의 위치와 강조형 학습",
        focus: PatternFocus::FrequencyAdverb,
        example: "She usually exercises in the morning.",
    },
    PatternDefinition {
        pattern_id: "article",
        label: "관사",
        description: "a/an/the 관사 선택 훈련",
        focus: PatternFocus::Article,
        example: "He adopted a dog from the shelter.",
    },
    PatternDefinition {
        pattern_id: "preposition",
        label: "전치사",
        description: "전치사의 올바른 조합과 위치",
        focus: PatternFocus::Preposition,
        example: "She put the book on the table.",
    },
    PatternDefinition {
        pattern_id: "auxiliary",
        label: "조동사",
        description: "조동사 사용과 어순 학습",
        focus: PatternFocus::Auxiliary,
        example: "Can you help me?",
    },
    PatternDefinition {
        pattern_id: "tense",
        label: "시제",
        description: "시제 변화와 조합 이해",
        focus: PatternFocus::Tense,
        example: "They have finished their homework.",
    },
    PatternDefinition {
        pattern_id: "clause",
        label: "절/구문",
        description: "명사절/형용사절/분사구문 등 확장 구조",
        focus: PatternFocus::Clause,
        example: "The book that I read was fascinating.",
    },
];

pub const DEFAULT_PATTERN_ID: &str = "time-adverb";

pub fn find_pattern(pattern_id: &str) -> Option<&'static PatternDefinition> {
    PATTERN_DEFINITIONS
        .iter()
        .find(|definition| definition.pattern_id == pattern_id)
}

/// Display label for a pattern id; unknown ids are shown as-is.
pub fn pattern_label(pattern_id: &str) -> String {
    find_pattern(pattern_id)
        .map(|definition| definition.label.to_string())
        .unwrap_or_else(|| pattern_id.to_string())
}

pub fn pattern_focus(pattern_id: &str) -> PatternFocus {
    find_pattern(pattern_id)
        .map(|definition| definition.focus)
        .unwrap_or(PatternFocus::Clause)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique() {
        let mut ids: Vec<_> = PATTERN_DEFINITIONS.iter().map(|p| p.pattern_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), PATTERN_DEFINITIONS.len());
        assert!(find_pattern(DEFAULT_PATTERN_ID).is_some());
    }

    #[test]
    fn unknown_pattern_uses_id_and_clause_focus() {
        assert_eq!(pattern_label("article"), "관사");
        assert_eq!(pattern_label("idiom"), "idiom");
        assert_eq!(pattern_focus("idiom"), PatternFocus::Clause);
        assert_eq!(pattern_focus("tense"), PatternFocus::Tense);
    }
}
