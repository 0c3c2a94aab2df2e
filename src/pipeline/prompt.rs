//! Prompt construction for the extraction chat-completion call.
//!
//! The system prompt carries the biomarker vocabulary inline so the model
//! emits canonical codes directly. Reports are Russian-language, so the
//! prompt is too. Kept as constants so the request body for a given input
//! is reproducible.

use crate::config::MAX_PROMPT_CHARS;
use crate::models::LabProvider;

pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"Ты — медицинский AI-ассистент, специализирующийся на анализе лабораторных результатов.

Твоя задача — извлечь из текста результатов анализов структурированные данные о биомаркерах.

Правила:
1. Извлекай ТОЛЬКО реальные значения из текста, не придумывай данные
2. Приводи названия показателей к стандартным кодам (HGB, RBC, WBC, FE, B12, D3, TSH и т.д.)
3. Сохраняй оригинальное название показателя в поле raw_name
4. Извлекай референсные значения если они есть
5. Определяй единицы измерения
6. Если значение невозможно извлечь корректно, пропускай его

Стандартные коды биомаркеров:

ГЕМАТОЛОГИЯ:
- HGB (Гемоглобин)
- RBC (Эритроциты)
- WBC (Лейкоциты)
- PLT (Тромбоциты)
- HCT (Гематокрит)
- MCV (Средний объем эритроцита)
- MCH (Среднее содержание гемоглобина)
- MCHC (Средняя концентрация гемоглобина)
- RDW (Ширина распределения эритроцитов)
- MPV (Средний объем тромбоцитов)
- PCT (Тромбокрит)
- ESR (СОЭ)
- NEUT (Нейтрофилы)
- LYMPH (Лимфоциты)
- MONO (Моноциты)
- EOS (Эозинофилы)
- BASO (Базофилы)

БИОХИМИЯ:
- GLU (Глюкоза)
- TP (Общий белок)
- ALB (Альбумин)
- LDH (ЛДГ, лактатдегидрогеназа)
- CK (КФК, креатинкиназа)
- AMY (Амилаза)
- LIPA (Липаза)

ПЕЧЕНЬ:
- ALT (АЛТ)
- AST (АСТ)
- GGT (ГГТП, гамма-глутамилтрансфераза)
- ALP (Щелочная фосфатаза)
- BILI (Билирубин общий)
- DBILI (Билирубин прямой)

ПОЧКИ:
- CREA (Креатинин)
- UREA (Мочевина)
- UA (Мочевая кислота)
- GFR (СКФ)

ЛИПИДЫ:
- CHOL (Холестерин общий)
- HDL (ЛПВП)
- LDL (ЛПНП)
- TG (Триглицериды)

МИНЕРАЛЫ:
- FE (Железо)
- FERR (Ферритин)
- CA (Кальций)
- MG (Магний)
- K (Калий)
- NA (Натрий)
- P (Фосфор)
- ZN (Цинк)

ВИТАМИНЫ:
- B12 (Витамин B12)
- FOLATE (Фолиевая кислота)
- D3 (Витамин D)

ГОРМОНЫ / ЩИТОВИДКА:
- TSH (ТТГ)
- T3 (Т3 свободный)
- T4 (Т4 свободный)
- FT3 (Т3 свободный)
- FT4 (Т4 свободный)

ПОЛОВЫЕ ГОРМОНЫ И ДР.:
- TEST (Тестостерон общий/свободный)
- SHBG (ГСПГ, секс-связывающий глобулин)
- PROL (Пролактин)
- FAI (Индекс свободного тестостерона, ИСТ)
- E2 (Эстрадиол)
- PROG (Прогестерон)
- LH (ЛГ)
- FSH (ФСГ)
- CORT (Кортизол)
- INS (Инсулин)

ВОСПАЛЕНИЕ:
- CRP (С-реактивный белок)

Отвечай ТОЛЬКО валидным JSON без markdown-разметки."#;

const JSON_SHAPE: &str = r#"{
    "lab_name": "название лаборатории если есть",
    "analysis_date": "дата анализа в формате YYYY-MM-DD если есть",
    "biomarkers": [
        {
            "code": "стандартный код (HGB, FE, TSH и т.д.)",
            "raw_name": "оригинальное название из текста",
            "value": числовое_значение,
            "unit": "единица измерения",
            "ref_min": минимум_нормы_или_null,
            "ref_max": максимум_нормы_или_null
        }
    ]
}"#;

/// User prompt for text extraction. The source text is truncated to
/// `MAX_PROMPT_CHARS` on a character boundary; a report that long has
/// already said everything useful.
pub fn build_text_prompt(source_text: &str, lab_hint: Option<LabProvider>) -> String {
    let truncated = truncate_chars(source_text, MAX_PROMPT_CHARS);

    let mut prompt = format!(
        "Извлеки биомаркеры из следующего текста результатов анализов:\n\n```\n{truncated}\n```\n\nВерни JSON в формате:\n{JSON_SHAPE}"
    );
    if let Some(lab) = lab_hint {
        prompt.push_str(&format!(
            "\n\nИзвестно, что это анализ из лаборатории: {}",
            lab.as_str()
        ));
    }
    prompt
}

/// User prompt for the vision variant: the image travels alongside, so the
/// text part only states the task and the JSON contract.
pub fn build_vision_prompt() -> String {
    format!(
        "Извлеки ВСЕ биомаркеры из этого изображения анализа крови.\n\nВАЖНО: Внимательно прочитай ВСЕ значения, включая рукописные!\n\nВерни JSON:\n{JSON_SHAPE}"
    )
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_prompt_embeds_source() {
        let prompt = build_text_prompt("Гемоглобин: 140 г/л", None);
        assert!(prompt.contains("Гемоглобин: 140 г/л"));
        assert!(prompt.contains("\"biomarkers\""));
        assert!(!prompt.contains("лаборатории:"));
    }

    #[test]
    fn lab_hint_appended() {
        let prompt = build_text_prompt("текст", Some(LabProvider::Invitro));
        assert!(prompt.contains("Известно, что это анализ из лаборатории: invitro"));
    }

    #[test]
    fn long_text_truncated_on_char_boundary() {
        // Multibyte input; byte-index truncation would panic mid-char. The
        // filler char does not occur in the surrounding template text, so
        // counting it measures the embedded source segment alone.
        let text = "ж".repeat(MAX_PROMPT_CHARS + 500);
        let prompt = build_text_prompt(&text, None);
        assert_eq!(prompt.chars().filter(|&c| c == 'ж').count(), MAX_PROMPT_CHARS);
    }

    #[test]
    fn system_prompt_lists_vocabulary_codes() {
        for code in ["HGB", "TSH", "FERR", "CRP"] {
            assert!(EXTRACTION_SYSTEM_PROMPT.contains(code));
        }
    }
}
