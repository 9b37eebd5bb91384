//! Prompt templates for the drafting, critique, revision and description agents.
//!
//! Output language is Russian; length, structure and markup rules live here as
//! instructions only. Nothing downstream enforces them except the description
//! clamp and the humanizer.

use seostudio_crawler::truncate_chars;
use seostudio_shared::PageBrief;

/// Page context is cut to this many characters inside the draft prompt.
pub const DRAFT_CONTEXT_CHARS: usize = 2000;

/// Transitions the drafting agent is told to avoid.
const DRAFT_BANNED: &str = r#""Кроме того", "Важно отметить", "В заключение""#;

/// Words the revision agent is told to remove.
const REVISION_BANNED: &str = r#""Кроме того", "Является", "Важно", "Подчеркивает""#;

/// First-pass long-form copy for one page.
pub fn draft_prompt(brief: &PageBrief) -> String {
    let context = truncate_chars(&brief.page_context, DRAFT_CONTEXT_CHARS);
    format!(
        r#"РОЛЬ: опытный копирайтер, который пишет тексты для страниц сайта живым человеческим языком.
ЗАДАЧА: напиши текст для страницы сайта: {title} ({link}).

ИСХОДНЫЕ ДАННЫЕ:
- Ключевые слова: {keywords}
- Текущий Description: {description}
- Смысловой контекст страницы: {context}

СТИЛЬ:
- Пиши как человек, который сам пользовался тем, о чем рассказывает. С интересом, но для сайта, не для блога.
- Оригинально и без шаблонов. Четко и по делу.
- После прочтения у читателя должно появиться желание действовать.

ОГРАНИЧЕНИЯ:
- Язык: РУССКИЙ.
- Объем: СТРОГО 1400–1600 символов.
- Структура: 3–4 логических абзаца.
- Форматирование: выдели основные ключевые фразы (2–3 раза за текст) жирным через двойные звездочки: **фраза**.
- ЗАПРЕЩЕНО: заголовки (#), HTML, списки.
- Никаких вступлений вроде "Конечно!" или "Вот текст".
- Избегай клише: {banned}.

Выдай только текст."#,
        title = brief.title,
        link = brief.link,
        keywords = brief.keywords,
        description = brief.prior_description,
        banned = DRAFT_BANNED,
    )
}

/// Score the candidate on four fixed dimensions and list concrete fixes.
pub fn critique_prompt(candidate: &str, keywords: &str) -> String {
    format!(
        r#"РОЛЬ: строгий критик и редактор.
ЗАДАЧА: оцени текст по 10-балльной шкале.

ТЕКСТ:
{candidate}

КРИТЕРИИ (1–10):
1) SEO для Google (использование ключевых слов: {keywords})
2) Оригинальность (индивидуальность стиля)
3) Качество написания (ритм, отсутствие "воды")
4) Человечность (нет признаков AI, естественность)

ФОРМАТ ОТВЕТА:
SCORES: [S1, S2, S3, S4]
FEEDBACK: [список конкретных замечаний для исправления]"#
    )
}

/// Rewrite the candidate to address the critique.
pub fn revision_prompt(candidate: &str, feedback: &str) -> String {
    format!(
        r#"РОЛЬ: опытный редактор.
ЗАДАЧА: исправь текст по замечаниям критика так, чтобы по ВСЕМ пунктам получилось 10/10.

ИСХОДНЫЙ ТЕКСТ:
{candidate}

ЗАМЕЧАНИЯ КРИТИКА:
{feedback}

ПРАВИЛА:
- Сохрани разбивку на абзацы и жирный шрифт (**).
- НИКАКИХ заголовков (#) и HTML.
- Убери AI-слова: {banned}.
- Сохрани объем 1400–1600 символов.
- Язык: РУССКИЙ.

Выдай только итоговый текст."#,
        banned = REVISION_BANNED,
    )
}

/// Short meta description for one page.
pub fn describe_prompt(title: &str, keywords: &str, old_description: &str) -> String {
    format!(
        r#"Ты SEO-специалист. Напиши meta description на русском языке.
Схема:
- [Ключевая фраза ближе к началу] + [Конкретная выгода или отличие] + [Призыв к действию]
Ограничения:
- Длина: 140–155 символов (строго).
- Ключевые слова: {keywords}
- Опирайся на: {title} - {old_description}
- Тон: естественный, без спама.

Выдай ТОЛЬКО description, без кавычек."#
    )
}
