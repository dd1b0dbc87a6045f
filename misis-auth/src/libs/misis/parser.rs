//! HTML extraction of the portal pages.
//!
//! [`Html`] is not `Send`, so every function here parses and drops the document synchronously.

use scraper::{ElementRef, Html, Selector};

use crate::models::user::Profile;

/// Label element candidates, in order of preference.
const LABEL_SELECTORS: [&'static str; 4] = [".person__label", "span", "label", "td"];
/// Value element candidates for the sibling following a label.
const VALUE_CLASS_SELECTOR: &'static str = ".person__value, .value";
/// Full name candidates, in order of preference.
const NAME_SELECTORS: [&'static str; 6] = [
    ".person_name h3",
    ".person_name",
    "h1",
    "h2",
    ".name",
    ".full-name",
];

/// Returns the `content` of `<meta name="csrf-token">`.
pub fn parse_csrf_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"meta[name="csrf-token"]"#).ok()?;
    let token = document
        .select(&selector)
        .filter_map(|e| e.value().attr("content"))
        .find(|c| c.len() > 0)?;
    Some(token.to_string())
}

/// Extracts profile fields from the profile page.
///
/// Returns `None` when no field can be found at all.
pub fn parse_profile(html: &str) -> Option<Profile> {
    let document = Html::parse_document(html);
    let value = |labels: &[&str]| -> Option<String> {
        labels.iter().find_map(|label| extract_value(&document, label))
    };

    let profile = Profile {
        full_name: extract_full_name(&document),
        record_book_number: value(&["Номер зачетки:", "Зачетка:"]),
        study_form: value(&["Форма обучения:", "Форма:"]),
        preparation_level: value(&["Уровень подготовки:", "Уровень:"]),
        specialization: value(&["Специализация:", "Направление:"]),
        specialty: value(&["Специальность:"]),
        faculty: value(&["Факультет:"]),
        course: value(&["Курс:"]),
        group: value(&["Группа:"]),
        financing_form: value(&["Форма финансирования:", "Финансирование:"]),
        dormitory: value(&["Общежитие:"]),
        end_date: value(&["Дата окончания:", "Окончание:"]),
        personal_email: value(&["Личная почта:", "Email:"]),
        personal_phone: value(&["Личный номер телефона:", "Телефон:"]),
        corporate_email: value(&["Корпоративная почта:", "Рабочая почта:"]),
    };
    match profile == Profile::default() {
        false => Some(profile),
        true => None,
    }
}

fn extract_full_name(document: &Html) -> Option<String> {
    for name_selector in NAME_SELECTORS {
        let selector = match Selector::parse(name_selector) {
            Err(_) => continue,
            Ok(selector) => selector,
        };
        for element in document.select(&selector) {
            if let Some(name) = non_empty(text_of(&element)) {
                return Some(name);
            }
        }
    }
    None
}

/// Finds the first element containing `label` and returns the text of its value element.
///
/// The value is searched in the next sibling first and then among the `span`/`td` elements of
/// the label's parent.
fn extract_value(document: &Html, label: &str) -> Option<String> {
    let value_class = Selector::parse(VALUE_CLASS_SELECTOR).ok()?;
    let parent_values = Selector::parse("span, td").ok()?;

    for label_selector in LABEL_SELECTORS {
        let selector = match Selector::parse(label_selector) {
            Err(_) => continue,
            Ok(selector) => selector,
        };
        let labels = document
            .select(&selector)
            .filter(|e| text_of(e).contains(label));
        for label_elem in labels {
            if let Some(next) = label_elem
                .next_siblings()
                .find_map(ElementRef::wrap)
            {
                let label_tag = label_elem.value().name();
                let next_tag = next.value().name();
                let is_value = value_class.matches(&next)
                    || (label_tag == "span" && next_tag == "span")
                    || (label_tag == "td" && next_tag == "td")
                    || (label_tag == "label" && next_tag == "span");
                if is_value {
                    if let Some(value) = non_empty(text_of(&next)) {
                        return Some(value);
                    }
                }
            }

            if let Some(parent) = label_elem.parent().and_then(ElementRef::wrap) {
                let value: Vec<String> = parent
                    .select(&parent_values)
                    .filter(|e| e.id() != label_elem.id() && !text_of(e).contains(label))
                    .map(|e| text_of(&e))
                    .collect();
                if let Some(value) = non_empty(value.join(" ")) {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// Text content with whitespace runs collapsed.
fn text_of(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<&str>>()
        .join(" ")
}

fn non_empty(value: String) -> Option<String> {
    match value.trim() {
        "" => None,
        value => Some(value.to_string()),
    }
}
