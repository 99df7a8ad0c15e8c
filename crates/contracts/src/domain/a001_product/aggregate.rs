use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::locale::{resolve_localized, Locale, LocalizedField, LocalizedFields};

// ============================================================================
// Product record
// ============================================================================

/// Товар витрины в том виде, в котором он лежит в таблице после синхронизации
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// Первичный ключ, строго положительный
    pub id: i64,

    pub category: Option<String>,

    /// Цена; `None`, если в источнике было не число
    pub price: Option<f64>,

    pub image_url: Option<String>,

    /// Остаток, не меньше нуля
    pub stock: i64,

    pub status: Option<String>,

    /// Языковые поля по языкам (как минимум `zh`)
    pub localized: BTreeMap<Locale, LocalizedFields>,
}

impl ProductRecord {
    /// Новый товар с названием на языке по умолчанию
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        let mut localized = BTreeMap::new();
        localized.insert(
            Locale::DEFAULT,
            LocalizedFields {
                name: Some(name.into()),
                ..Default::default()
            },
        );
        Self {
            id,
            category: None,
            price: None,
            image_url: None,
            stock: 0,
            status: None,
            localized,
        }
    }

    pub fn localized_mut(&mut self, locale: Locale) -> &mut LocalizedFields {
        self.localized.entry(locale).or_default()
    }

    /// Значение языкового поля с откатом на `zh`
    pub fn field(&self, locale: Locale, field: LocalizedField) -> Option<&str> {
        resolve_localized(&self.localized, locale, field)
    }

    /// Название на языке по умолчанию (обязательно для валидной записи)
    pub fn default_name(&self) -> &str {
        self.field(Locale::DEFAULT, LocalizedField::Name)
            .unwrap_or_default()
    }

    /// Представление товара для витрины на конкретном языке
    pub fn to_view(&self, locale: Locale) -> ProductView {
        let text = |field: LocalizedField| self.field(locale, field).map(str::to_string);
        ProductView {
            id: self.id,
            category: self.category.clone(),
            name: text(LocalizedField::Name).unwrap_or_default(),
            price: self.price,
            image_url: self.image_url.clone(),
            stock: self.stock,
            status: self.status.clone(),
            display_description: text(LocalizedField::DisplayDescription),
            gift_detail_description: text(LocalizedField::GiftDetailDescription),
            product_description: text(LocalizedField::ProductDescription),
            product_specs: text(LocalizedField::ProductSpecs),
            shipping_info: text(LocalizedField::ShippingInfo),
        }
    }
}

// ============================================================================
// View for the storefront
// ============================================================================

/// Товар, уже разрешенный под язык запроса (GET /api/products?lang=..)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: i64,
    pub category: Option<String>,
    pub name: String,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub stock: i64,
    pub status: Option<String>,
    pub display_description: Option<String>,
    pub gift_detail_description: Option<String>,
    pub product_description: Option<String>,
    pub product_specs: Option<String>,
    pub shipping_info: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_falls_back_to_default_locale() {
        let mut record = ProductRecord::new(7, "Mug");
        record.localized_mut(Locale::Zh).display_description = Some("白色陶瓷".to_string());

        let view = record.to_view(Locale::En);
        assert_eq!(view.name, "Mug");
        assert_eq!(view.display_description.as_deref(), Some("白色陶瓷"));
        assert_eq!(view.product_specs, None);
    }

    #[test]
    fn test_view_uses_english_when_present() {
        let mut record = ProductRecord::new(7, "马克杯");
        record.localized_mut(Locale::En).name = Some("Mug".to_string());

        assert_eq!(record.to_view(Locale::En).name, "Mug");
        assert_eq!(record.to_view(Locale::Zh).name, "马克杯");
        assert_eq!(record.default_name(), "马克杯");
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let mut record = ProductRecord::new(1, "Mug");
        record.image_url = Some("https://img/1.png".to_string());
        let json = serde_json::to_value(record.to_view(Locale::Zh)).unwrap();
        assert_eq!(json["imageUrl"], "https://img/1.png");
        assert!(json.get("displayDescription").is_some());
    }

    #[test]
    fn test_record_json_keys_by_locale_tag() {
        let record = ProductRecord::new(3, "杯子");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["localized"]["zh"]["name"], "杯子");
    }
}
