//! Deterministic post-processing for generated page copy.
//!
//! [`humanize`] strips markup artifacts, removes "here is your text" preambles,
//! swaps stock AI transition phrases for colloquial ones and normalizes
//! whitespace. No network, no randomness: the same input always yields the
//! same output, and `humanize(humanize(x)) == humanize(x)`.

mod cleanup;

use tracing::{debug, instrument};

/// Phrase substitutions applied by [`humanize`], in application order.
pub fn phrase_table() -> &'static [(&'static str, &'static str)] {
    cleanup::PHRASE_TABLE
}

/// Clean generated copy for publication.
#[instrument(skip_all, fields(input_len = text.len()))]
pub fn humanize(text: &str) -> String {
    let result = cleanup::run_pipeline(text);
    debug!(output_len = result.len(), "humanized text");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn representative_inputs() -> Vec<String> {
        let mut inputs: Vec<String> = phrase_table()
            .iter()
            .map(|(from, _)| format!("Абзац. {from} лайнер ждёт.\n\n\n\nКонец."))
            .collect();
        inputs.extend([
            "### Заголовок\nКроме того, это круто.".to_string(),
            "<h2>Круизы</h2>\n<p>Текст</p>\n\n\n\n\n<br/>Еще".to_string(),
            "Конечно!\nВот ваш текст:\n## Тема\n\n**Волга**  и   `Дон`\t__реки__".to_string(),
            "  \n\nСтатья: круизы\n\nВажно отметить, что Кроме того, всё\n \n \n \nок.  ".to_string(),
            "Важно отметить, что Важно отметить, что двойной".to_string(),
            "<<b>#</b>>Текст#\n\n\n".to_string(),
            "Вот почему круизы популярны.\n\nВот маршрут.\n\nТретий абзац.".to_string(),
            String::new(),
        ]);
        inputs
    }

    #[test]
    fn heading_and_cliche_example() {
        let result = humanize("### Заголовок\nКроме того, это круто.");
        assert!(result.starts_with("Заголовок"));
        assert!(!result.contains('#'));
        assert!(result.contains("А еще,"));
    }

    #[test]
    fn humanize_is_idempotent() {
        for input in representative_inputs() {
            let once = humanize(&input);
            let twice = humanize(&once);
            assert_eq!(once, twice, "not idempotent for input {input:?}");
        }
    }

    #[test]
    fn humanize_removes_every_cliche() {
        for (from, _) in phrase_table() {
            let result = humanize(&format!("Текст. {from} еще текст."));
            assert!(!result.contains(from), "{from} survived: {result}");
        }
    }

    #[test]
    fn humanize_never_leaves_excess_blank_lines() {
        for input in representative_inputs() {
            let result = humanize(&input);
            assert!(!result.contains("\n\n\n"), "excess newlines in {result:?}");
            assert_eq!(result, result.trim());
        }
    }

    #[test]
    fn humanize_keeps_paragraphs_opening_with_preamble_words() {
        let input = "Вот почему круизы по Волге популярны.\n\nВот маршрут на неделю.\n\nТретий абзац.";
        assert_eq!(humanize(input), input);
    }

    #[test]
    fn humanize_empty() {
        assert_eq!(humanize(""), "");
        assert_eq!(humanize("   \n\n  "), "");
    }
}
