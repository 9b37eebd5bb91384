//! Humanizer cleanup pipeline for generated copy.
//!
//! Each pass is a function `&str -> String` applied in sequence. The whole
//! sequence is repeated until the text stops changing, so the result is a
//! fixed point of the pipeline. Only stacked preamble lines are affected by
//! the repetition; content lines never match the preamble test.

use std::sync::LazyLock;

use regex::Regex;

/// Stock AI transition phrases and their colloquial replacements, applied in order.
pub(crate) const PHRASE_TABLE: &[(&str, &str)] = &[
    ("Кроме того,", "А еще,"),
    ("Более того,", "Также,"),
    ("В заключение,", "В общем,"),
    ("Следовательно,", "Так что,"),
    ("Важно отметить, что", ""),
    ("Стоит подчеркнуть, что", ""),
    ("Является идеальным выбором", "Отлично подойдет"),
    ("Предлагает широкий спектр", "Тут есть всё:"),
    ("Уникальная возможность", "Шанс"),
    ("Погрузитесь в мир", "Попробуйте"),
];

/// Run the pipeline to a fixed point.
pub(crate) fn run_pipeline(text: &str) -> String {
    let mut current = single_pass(text);
    // Every pass is non-lengthening and tabs are gone after the first round,
    // so each further change strictly shortens the text.
    loop {
        let next = single_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// One round of every pass, in order.
fn single_pass(text: &str) -> String {
    let mut result = strip_markup(text);

    result = strip_preamble(&result);
    result = replace_phrases(&result);
    result = normalize_whitespace(&result);
    result.trim().to_string()
}

// ---------------------------------------------------------------------------
// Pass 1: Strip technical markup
// ---------------------------------------------------------------------------

/// Remove HTML tags, heading markers, `__` italics and inline-code backticks.
///
/// `**bold**` survives; it is the only markup the copy is allowed to carry.
fn strip_markup(text: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
    static HEADING_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"#+\s*").expect("valid regex"));

    let result = HTML_TAG_RE.replace_all(text, "");
    let result = HEADING_RE.replace_all(&result, "");
    result.replace("__", "").replace('`', "")
}

// ---------------------------------------------------------------------------
// Pass 2: Strip AI preamble line
// ---------------------------------------------------------------------------

/// Longest line still treated as a preamble, in characters.
const PREAMBLE_MAX_CHARS: usize = 80;

/// Drop the first line when it is a stock "here is your text" preamble.
///
/// Label lines (`Текст:`, `Статья:`) always go. Lines opening with `Конечно`,
/// `Вот` or `Согласно вашему` go only when they are short and either stop at
/// the opener or end in `:` or `!`; ordinary sentences that merely start with
/// those words stay.
fn strip_preamble(text: &str) -> String {
    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
    if is_preamble(first) {
        rest.to_string()
    } else {
        text.to_string()
    }
}

fn is_preamble(line: &str) -> bool {
    static LABEL_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)^(?:Текст|Статья):").expect("valid regex"));
    static OPENER_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)^(?:Конечно|Вот|Согласно вашему)\b").expect("valid regex")
    });
    static BARE_OPENER_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)^(?:Конечно|Вот|Согласно вашему)\W*$").expect("valid regex")
    });

    let line = line.trim_end();
    if LABEL_RE.is_match(line) {
        return true;
    }
    OPENER_RE.is_match(line)
        && line.chars().count() <= PREAMBLE_MAX_CHARS
        && (line.ends_with(':') || line.ends_with('!') || BARE_OPENER_RE.is_match(line))
}

// ---------------------------------------------------------------------------
// Pass 3: Phrase substitutions
// ---------------------------------------------------------------------------

/// Apply [`PHRASE_TABLE`] as literal replacements, first to last.
fn replace_phrases(text: &str) -> String {
    PHRASE_TABLE
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

// ---------------------------------------------------------------------------
// Pass 4: Normalize whitespace
// ---------------------------------------------------------------------------

/// Collapse horizontal runs to one space, drop trailing spaces, keep at most
/// one blank line between paragraphs.
fn normalize_whitespace(text: &str) -> String {
    static HSPACE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));
    static TRAILING_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m) +$").expect("valid regex"));
    static MULTI_NEWLINE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    let result = HSPACE_RE.replace_all(text, " ");
    let result = TRAILING_RE.replace_all(&result, "");
    MULTI_NEWLINE_RE.replace_all(&result, "\n\n").to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_markup_removes_headings_and_tags() {
        let input = "## Круизы\n<p>Текст <b>важный</b></p>";
        assert_eq!(strip_markup(input), "Круизы\nТекст важный");
    }

    #[test]
    fn strip_markup_keeps_bold() {
        let input = "Лучший **круиз по Волге** и __курсив__ с `кодом`";
        assert_eq!(
            strip_markup(input),
            "Лучший **круиз по Волге** и курсив с кодом"
        );
    }

    #[test]
    fn strip_preamble_drops_first_line_only() {
        let input = "Конечно! Вот ваш текст:\nПервый абзац.\nВот второй.";
        assert_eq!(strip_preamble(input), "Первый абзац.\nВот второй.");
    }

    #[test]
    fn strip_preamble_is_case_insensitive() {
        let input = "СТАТЬЯ: про круизы\nТело.";
        assert_eq!(strip_preamble(input), "Тело.");
    }

    #[test]
    fn strip_preamble_ignores_later_lines() {
        let input = "Первый абзац.\nКонечно, это круто.";
        assert_eq!(strip_preamble(input), input);
    }

    #[test]
    fn replace_phrases_applies_table() {
        let input = "Кроме того, лайнер Является идеальным выбором. В заключение, едем.";
        assert_eq!(
            replace_phrases(input),
            "А еще, лайнер Отлично подойдет. В общем, едем."
        );
    }

    #[test]
    fn replace_phrases_can_delete() {
        let input = "Важно отметить, что каюты просторные.";
        assert_eq!(replace_phrases(input), " каюты просторные.");
    }

    #[test]
    fn normalize_whitespace_collapses_runs() {
        let input = "Один  \t два   \n\n\n\n\nтри";
        assert_eq!(normalize_whitespace(input), "Один два\n\nтри");
    }

    #[test]
    fn normalize_whitespace_keeps_paragraph_breaks() {
        let input = "Абзац один.\n\nАбзац два.";
        assert_eq!(normalize_whitespace(input), input);
    }

    #[test]
    fn normalize_whitespace_blank_lines_with_spaces() {
        let input = "А\n \n \n \nБ";
        assert_eq!(normalize_whitespace(input), "А\n\nБ");
    }

    #[test]
    fn strip_preamble_keeps_sentences_starting_with_opener() {
        for input in [
            "Вот почему круизы по Волге популярны.\nДальше.",
            "Конечно, каюты бывают разными.\nДальше.",
            "Согласно вашему запросу мы подобрали маршруты по Волге и Каме на всё лето.\nДальше.",
        ] {
            assert_eq!(strip_preamble(input), input);
        }
    }

    #[test]
    fn strip_preamble_drops_bare_opener() {
        assert_eq!(strip_preamble("Конечно.\nТело."), "Тело.");
        assert_eq!(strip_preamble("Вот ваш вариант:\nТело."), "Тело.");
    }

    #[test]
    fn pipeline_keeps_content_paragraphs_starting_with_vot() {
        let input = "Вот почему круизы по Волге популярны.\n\nВот маршрут на неделю.\n\nТретий абзац.";
        assert_eq!(run_pipeline(input), input);
    }

    #[test]
    fn pipeline_strips_only_preamble_before_vot_paragraph() {
        let input = "Конечно! Вот текст:\nВот почему круизы популярны.\n\nВторой абзац.";
        assert_eq!(
            run_pipeline(input),
            "Вот почему круизы популярны.\n\nВторой абзац."
        );
    }

    #[test]
    fn pipeline_strips_stacked_preambles() {
        let input = "Конечно!\nВот текст:\nСам текст.";
        assert_eq!(run_pipeline(input), "Сам текст.");
    }

    #[test]
    fn pipeline_preamble_after_leading_whitespace() {
        let input = "   \n\nВот ваш текст:\nСам текст.";
        assert_eq!(run_pipeline(input), "Сам текст.");
    }

    #[test]
    fn full_pipeline_cleans_copy() {
        let input = "Конечно, вот статья!\n# Круиз\n\n\n\n<div>Кроме того,   **Волга** ждёт.</div>\n\nПогрузитесь в мир рек.  ";
        let result = run_pipeline(input);

        assert_eq!(result, "Круиз\n\nА еще, **Волга** ждёт.\n\nПопробуйте рек.");
    }
}
