use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Locale
// ============================================================================

/// Язык витрины. `Zh` это язык по умолчанию, на него откатываются все поиски
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Zh,
    En,
}

impl Locale {
    pub const DEFAULT: Locale = Locale::Zh;

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Zh => "zh",
            Locale::En => "en",
        }
    }

    /// Суффикс колонки в двуязычной схеме таблицы (`name_zh`, `name_en`)
    pub fn column_suffix(&self) -> &'static str {
        match self {
            Locale::Zh => "_zh",
            Locale::En => "_en",
        }
    }

    /// Разбор тега вида "en", "en-US", "zh_TW". Неизвестный тег -> None
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag
            .trim()
            .split(|c| c == '-' || c == '_')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        match primary.as_str() {
            "zh" => Some(Locale::Zh),
            "en" => Some(Locale::En),
            _ => None,
        }
    }

    /// Тег из query-параметра; пустой или неизвестный -> язык по умолчанию
    pub fn from_tag_or_default(tag: Option<&str>) -> Self {
        tag.and_then(Self::from_tag).unwrap_or_default()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Localized fields
// ============================================================================

/// Поля товара, у которых есть языковые варианты
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalizedField {
    Name,
    DisplayDescription,
    GiftDetailDescription,
    ProductDescription,
    ProductSpecs,
    ShippingInfo,
}

impl LocalizedField {
    pub const ALL: [LocalizedField; 6] = [
        LocalizedField::Name,
        LocalizedField::DisplayDescription,
        LocalizedField::GiftDetailDescription,
        LocalizedField::ProductDescription,
        LocalizedField::ProductSpecs,
        LocalizedField::ShippingInfo,
    ];

    /// Базовое имя колонки (без языкового суффикса)
    pub fn column(&self) -> &'static str {
        match self {
            LocalizedField::Name => "name",
            LocalizedField::DisplayDescription => "display_description",
            LocalizedField::GiftDetailDescription => "gift_detail_description",
            LocalizedField::ProductDescription => "product_description",
            LocalizedField::ProductSpecs => "product_specs",
            LocalizedField::ShippingInfo => "shipping_info",
        }
    }
}

/// Набор языковых полей товара для одного языка
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedFields {
    pub name: Option<String>,
    pub display_description: Option<String>,
    pub gift_detail_description: Option<String>,
    pub product_description: Option<String>,
    pub product_specs: Option<String>,
    pub shipping_info: Option<String>,
}

impl LocalizedFields {
    fn slot(&self, field: LocalizedField) -> &Option<String> {
        match field {
            LocalizedField::Name => &self.name,
            LocalizedField::DisplayDescription => &self.display_description,
            LocalizedField::GiftDetailDescription => &self.gift_detail_description,
            LocalizedField::ProductDescription => &self.product_description,
            LocalizedField::ProductSpecs => &self.product_specs,
            LocalizedField::ShippingInfo => &self.shipping_info,
        }
    }

    fn slot_mut(&mut self, field: LocalizedField) -> &mut Option<String> {
        match field {
            LocalizedField::Name => &mut self.name,
            LocalizedField::DisplayDescription => &mut self.display_description,
            LocalizedField::GiftDetailDescription => &mut self.gift_detail_description,
            LocalizedField::ProductDescription => &mut self.product_description,
            LocalizedField::ProductSpecs => &mut self.product_specs,
            LocalizedField::ShippingInfo => &mut self.shipping_info,
        }
    }

    /// Значение поля; пустая строка считается отсутствующим значением
    pub fn get(&self, field: LocalizedField) -> Option<&str> {
        self.slot(field)
            .as_deref()
            .filter(|value| !value.trim().is_empty())
    }

    pub fn set(&mut self, field: LocalizedField, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    pub fn is_empty(&self) -> bool {
        LocalizedField::ALL.iter().all(|f| self.get(*f).is_none())
    }
}

/// Значение поля для запрошенного языка с откатом на язык по умолчанию.
///
/// Откат идет по каждому полю отдельно: если у `en` есть только название,
/// описание все равно берется из `zh`.
pub fn resolve_localized(
    bundles: &BTreeMap<Locale, LocalizedFields>,
    locale: Locale,
    field: LocalizedField,
) -> Option<&str> {
    bundles
        .get(&locale)
        .and_then(|fields| fields.get(field))
        .or_else(|| {
            bundles
                .get(&Locale::DEFAULT)
                .and_then(|fields| fields.get(field))
        })
}
