/// Canonical search key for a job title.
///
/// Missing input maps to `""`. Otherwise the text is lowercased, every char
/// that is not `[a-z0-9]` or whitespace is dropped, whitespace runs collapse
/// to a single space and the result is trimmed. The same function is applied
/// to the user's query, so `"Engenheiro!"` finds `"Engenheiro"`.
pub fn normalize_title(title: Option<&str>) -> String {
    let Some(title) = title else {
        return String::new();
    };

    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn missing_title_is_empty() {
        assert_eq!(normalize_title(None), "");
    }

    #[test]
    fn punctuation_and_case_are_dropped() {
        assert_eq!(
            normalize_title(Some("Engenheiro de Dados!")),
            "engenheiro de dados"
        );
        assert_eq!(normalize_title(Some("  Data   Scientist\t(II) ")), "data scientist ii");
    }

    #[test]
    fn accented_letters_are_stripped_not_folded() {
        assert_eq!(normalize_title(Some("Cientista de Dados Sênior")), "cientista de dados snior");
    }

    #[test]
    fn query_symmetry() {
        let title = normalize_title(Some("Engenheiro"));
        let query = normalize_title(Some("Engenheiro!"));
        assert!(title.contains(&query));
    }

    proptest! {
        #[test]
        fn idempotent(s in ".{0,80}") {
            let once = normalize_title(Some(&s));
            let twice = normalize_title(Some(&once));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn output_alphabet(s in ".{0,80}") {
            let out = normalize_title(Some(&s));
            prop_assert!(out.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' '));
            prop_assert!(!out.starts_with(' ') && !out.ends_with(' '));
            prop_assert!(!out.contains("  "));
        }
    }
}
