use std::collections::{BTreeMap, HashMap};

use contracts::domain::a001_product::{Locale, LocalizedField, LocalizedFields, ProductRecord};
use contracts::usecases::u501_sync_products::RejectionCounts;

use super::error::{RejectionReason, SyncError};
use super::raw_row::{parse_id, parse_price, parse_stock, CellValue, RawRow};
use crate::shared::config::{LocaleMode, PricePolicy};

/// Колонка листа, которую понимает маппер
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKey {
    Id,
    Category,
    Price,
    ImageUrl,
    Stock,
    Status,
    Localized(Locale, LocalizedField),
}

/// Соответствие колонок их позициям в строке
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    positions: HashMap<ColumnKey, usize>,
}

impl ColumnLayout {
    /// Фиксированная схема: id, category, name, price, image_url, stock, status,
    /// пять описательных полей zh, затем name и те же пять полей en
    pub fn positional() -> Self {
        let mut positions = HashMap::new();
        positions.insert(ColumnKey::Id, 0);
        positions.insert(ColumnKey::Category, 1);
        positions.insert(ColumnKey::Localized(Locale::Zh, LocalizedField::Name), 2);
        positions.insert(ColumnKey::Price, 3);
        positions.insert(ColumnKey::ImageUrl, 4);
        positions.insert(ColumnKey::Stock, 5);
        positions.insert(ColumnKey::Status, 6);

        // после name идут пять описательных полей
        for (offset, field) in LocalizedField::ALL.iter().skip(1).enumerate() {
            positions.insert(ColumnKey::Localized(Locale::Zh, *field), 7 + offset);
            positions.insert(ColumnKey::Localized(Locale::En, *field), 13 + offset);
        }
        positions.insert(ColumnKey::Localized(Locale::En, LocalizedField::Name), 12);

        Self { positions }
    }

    /// Позиции по строке заголовка. Без колонок id и name прогон невозможен.
    pub fn from_header(header: &RawRow) -> Result<Self, SyncError> {
        let aliases = header_aliases();
        let mut positions = HashMap::new();

        for (index, cell) in header.cells.iter().enumerate() {
            let Some(title) = cell.as_text() else {
                continue;
            };
            if let Some(key) = aliases.get(normalize_header(&title).as_str()) {
                // при повторе заголовка берется первая колонка
                positions.entry(*key).or_insert(index);
            }
        }

        let required = [
            (ColumnKey::Id, "id"),
            (ColumnKey::Localized(Locale::DEFAULT, LocalizedField::Name), "name"),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(key, _)| !positions.contains_key(key))
            .map(|(_, title)| *title)
            .collect();
        if !missing.is_empty() {
            return Err(SyncError::SourceConfigInvalid(format!(
                "Header row {} has no required column(s): {}",
                header.number,
                missing.join(", ")
            )));
        }

        Ok(Self { positions })
    }

    pub fn position(&self, key: ColumnKey) -> Option<usize> {
        self.positions.get(&key).copied()
    }
}

/// "Image URL", "image_url", "imageUrl" -> "imageurl"
fn normalize_header(title: &str) -> String {
    title
        .chars()
        .filter(|c| !matches!(c, '_' | ' ' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn header_aliases() -> HashMap<String, ColumnKey> {
    let mut aliases = HashMap::new();
    for (title, key) in [
        ("id", ColumnKey::Id),
        ("category", ColumnKey::Category),
        ("price", ColumnKey::Price),
        ("imageurl", ColumnKey::ImageUrl),
        ("image", ColumnKey::ImageUrl),
        ("stock", ColumnKey::Stock),
        ("status", ColumnKey::Status),
    ] {
        aliases.insert(title.to_string(), key);
    }

    for field in LocalizedField::ALL {
        let base = normalize_header(field.column());
        aliases.insert(base.clone(), ColumnKey::Localized(Locale::DEFAULT, field));
        for locale in [Locale::Zh, Locale::En] {
            aliases.insert(
                format!("{}{}", base, locale.as_str()),
                ColumnKey::Localized(locale, field),
            );
        }
    }
    aliases
}

// ============================================================================
// Mapper
// ============================================================================

/// Итог разбора всех строк листа
#[derive(Debug, Clone, Default)]
pub struct MappingSummary {
    /// Валидные записи, по одной на id, упорядочены по id
    pub records: Vec<ProductRecord>,
    pub rejected: RejectionCounts,
    pub blank_rows: usize,
    pub duplicates: usize,
    pub unparsed_prices: usize,
}

/// Преобразование строки листа в запись товара
#[derive(Debug, Clone)]
pub struct RowMapper {
    layout: ColumnLayout,
    locale_mode: LocaleMode,
    price_policy: PricePolicy,
}

impl RowMapper {
    pub fn new(layout: ColumnLayout, locale_mode: LocaleMode, price_policy: PricePolicy) -> Self {
        Self {
            layout,
            locale_mode,
            price_policy,
        }
    }

    fn cell<'r>(&self, row: &'r RawRow, key: ColumnKey) -> Option<&'r CellValue> {
        self.layout.position(key).and_then(|index| row.cell(index))
    }

    fn text(&self, row: &RawRow, key: ColumnKey) -> Option<String> {
        self.cell(row, key).and_then(CellValue::as_text)
    }

    fn localized_fields(&self, row: &RawRow, locale: Locale) -> LocalizedFields {
        let mut fields = LocalizedFields::default();
        for field in LocalizedField::ALL {
            fields.set(field, self.text(row, ColumnKey::Localized(locale, field)));
        }
        fields
    }

    /// Одна строка -> запись или причина отказа. Без побочных эффектов.
    pub fn map_row(&self, row: &RawRow) -> Result<ProductRecord, RejectionReason> {
        let id = parse_id(self.cell(row, ColumnKey::Id))
            .ok_or(RejectionReason::MissingOrInvalidId)?;

        let default_fields = self.localized_fields(row, Locale::DEFAULT);
        if default_fields.name.is_none() {
            return Err(RejectionReason::MissingName);
        }

        let price = parse_price(self.cell(row, ColumnKey::Price));
        if price.is_none() && self.price_policy == PricePolicy::Strict {
            return Err(RejectionReason::InvalidPrice);
        }

        let mut localized = BTreeMap::new();
        localized.insert(Locale::DEFAULT, default_fields);
        if self.locale_mode == LocaleMode::Bilingual {
            let en_fields = self.localized_fields(row, Locale::En);
            if !en_fields.is_empty() {
                localized.insert(Locale::En, en_fields);
            }
        }

        Ok(ProductRecord {
            id,
            category: self.text(row, ColumnKey::Category),
            price,
            image_url: self.text(row, ColumnKey::ImageUrl),
            stock: parse_stock(self.cell(row, ColumnKey::Stock)),
            status: self.text(row, ColumnKey::Status),
            localized,
        })
    }

    /// Ленивый разбор; пустые строки пропускаются
    pub fn map_rows<'a>(
        &'a self,
        rows: &'a [RawRow],
    ) -> impl Iterator<Item = (&'a RawRow, Result<ProductRecord, RejectionReason>)> + 'a {
        rows.iter()
            .filter(|row| !row.is_blank())
            .map(move |row| (row, self.map_row(row)))
    }

    /// Цена была в ячейке, но не разобрана (только для lenient)
    fn has_unparsed_price(&self, row: &RawRow, record: &ProductRecord) -> bool {
        record.price.is_none()
            && self
                .cell(row, ColumnKey::Price)
                .is_some_and(|cell| !cell.is_blank())
    }

    /// Разбор всех строк. Отказы считаются и пишутся в лог, но не прерывают проход.
    pub fn collect_records(&self, rows: &[RawRow]) -> MappingSummary {
        let mut summary = MappingSummary {
            blank_rows: rows.iter().filter(|row| row.is_blank()).count(),
            ..Default::default()
        };
        let mut by_id: BTreeMap<i64, ProductRecord> = BTreeMap::new();

        for (row, result) in self.map_rows(rows) {
            match result {
                Ok(record) => {
                    if self.has_unparsed_price(row, &record) {
                        summary.unparsed_prices += 1;
                        tracing::debug!("Row {}: price is not a number, stored as NULL", row.number);
                    }
                    if let Some(previous) = by_id.insert(record.id, record) {
                        summary.duplicates += 1;
                        tracing::warn!(
                            "Row {}: duplicate id {}, earlier row overridden",
                            row.number,
                            previous.id
                        );
                    }
                }
                Err(reason) => {
                    count_rejection(&mut summary.rejected, reason);
                    tracing::warn!("Row {} rejected: {}", row.number, reason);
                }
            }
        }

        summary.records = by_id.into_values().collect();
        summary
    }
}

fn count_rejection(counts: &mut RejectionCounts, reason: RejectionReason) {
    match reason {
        RejectionReason::MissingOrInvalidId => counts.missing_or_invalid_id += 1,
        RejectionReason::MissingName => counts.missing_name += 1,
        RejectionReason::InvalidPrice => counts.invalid_price += 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(number: usize, cells: &[&str]) -> RawRow {
        RawRow::new(
            number,
            cells
                .iter()
                .map(|c| {
                    if c.is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(c.to_string())
                    }
                })
                .collect(),
        )
    }

    fn mapper(mode: LocaleMode, policy: PricePolicy) -> RowMapper {
        RowMapper::new(ColumnLayout::positional(), mode, policy)
    }

    #[test]
    fn test_scenario_mug_and_missing_name() {
        let rows = vec![
            row(2, &["1", "", "Mug", "9,99"]),
            row(3, &["2", "", "", "5.00"]),
        ];
        let summary = mapper(LocaleMode::Bilingual, PricePolicy::Lenient).collect_records(&rows);

        assert_eq!(summary.records.len(), 1);
        assert_eq!(summary.records[0].id, 1);
        assert_eq!(summary.records[0].price, Some(9.99));
        assert_eq!(summary.records[0].default_name(), "Mug");
        assert_eq!(summary.rejected.missing_name, 1);
        assert_eq!(summary.rejected.total(), 1);
    }

    #[test]
    fn test_rejects_missing_or_invalid_id() {
        let m = mapper(LocaleMode::Bilingual, PricePolicy::Lenient);
        for id in ["", "abc", "0", "-5", "1.5"] {
            assert_eq!(
                m.map_row(&row(2, &[id, "", "Mug"])),
                Err(RejectionReason::MissingOrInvalidId),
                "id {:?}",
                id
            );
        }
    }

    #[test]
    fn test_id_checked_before_name() {
        let m = mapper(LocaleMode::Bilingual, PricePolicy::Lenient);
        assert_eq!(
            m.map_row(&row(2, &["", "", ""])),
            Err(RejectionReason::MissingOrInvalidId)
        );
    }

    #[test]
    fn test_whitespace_name_is_missing() {
        let m = mapper(LocaleMode::Bilingual, PricePolicy::Lenient);
        assert_eq!(
            m.map_row(&row(2, &["4", "cups", "   "])),
            Err(RejectionReason::MissingName)
        );
    }

    #[test]
    fn test_price_policy() {
        let r = row(2, &["1", "", "Mug", "free"]);

        let lenient = mapper(LocaleMode::Bilingual, PricePolicy::Lenient);
        let record = lenient.map_row(&r).unwrap();
        assert_eq!(record.price, None);

        let strict = mapper(LocaleMode::Bilingual, PricePolicy::Strict);
        assert_eq!(strict.map_row(&r), Err(RejectionReason::InvalidPrice));

        let summary = lenient.collect_records(&[r]);
        assert_eq!(summary.unparsed_prices, 1);
    }

    #[test]
    fn test_full_positional_row() {
        let r = row(
            2,
            &[
                "10", "Cups", "马克杯", "1,299", "https://img/10.png", "7.9", "published",
                "白色", "", "陶瓷杯", "350ml", "三天", "Mug", "White", "", "", "", "",
            ],
        );
        let record = mapper(LocaleMode::Bilingual, PricePolicy::Lenient)
            .map_row(&r)
            .unwrap();

        assert_eq!(record.id, 10);
        assert_eq!(record.category.as_deref(), Some("Cups"));
        assert_eq!(record.price, Some(1299.0));
        assert_eq!(record.stock, 7);
        assert_eq!(record.status.as_deref(), Some("published"));
        assert_eq!(record.field(Locale::Zh, LocalizedField::ProductSpecs), Some("350ml"));
        assert_eq!(record.field(Locale::En, LocalizedField::Name), Some("Mug"));
        // gift detail нет ни на одном языке
        assert_eq!(record.field(Locale::En, LocalizedField::GiftDetailDescription), None);
        // en specs пуст -> откат на zh
        assert_eq!(record.field(Locale::En, LocalizedField::ProductSpecs), Some("350ml"));
    }

    #[test]
    fn test_english_bundle_only_when_present_and_bilingual() {
        let zh_only = row(2, &["1", "", "马克杯"]);
        let record = mapper(LocaleMode::Bilingual, PricePolicy::Lenient)
            .map_row(&zh_only)
            .unwrap();
        assert!(!record.localized.contains_key(&Locale::En));

        let mut cells = vec![""; 13];
        cells[0] = "1";
        cells[2] = "马克杯";
        cells[12] = "Mug";
        let with_en = row(2, &cells);
        let record = mapper(LocaleMode::DefaultOnly, PricePolicy::Lenient)
            .map_row(&with_en)
            .unwrap();
        assert!(!record.localized.contains_key(&Locale::En));
    }

    #[test]
    fn test_blank_rows_and_duplicates() {
        let rows = vec![
            row(2, &["1", "", "Old mug", "3"]),
            row(3, &["", "", "", ""]),
            row(4, &["1", "", "New mug", "4"]),
            row(5, &["2", "", "Plate"]),
        ];
        let summary = mapper(LocaleMode::Bilingual, PricePolicy::Lenient).collect_records(&rows);

        assert_eq!(summary.blank_rows, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.rejected.total(), 0);
        assert_eq!(summary.records.len(), 2);
        assert_eq!(summary.records[0].default_name(), "New mug");
        assert_eq!(summary.records[0].price, Some(4.0));
    }

    #[test]
    fn test_numeric_cells() {
        let r = RawRow::new(
            2,
            vec![
                CellValue::Number(5.0),
                CellValue::Number(42.0),
                CellValue::Text("Bowl".into()),
                CellValue::Number(12.5),
            ],
        );
        let record = mapper(LocaleMode::Bilingual, PricePolicy::Strict)
            .map_row(&r)
            .unwrap();
        assert_eq!(record.id, 5);
        assert_eq!(record.category.as_deref(), Some("42"));
        assert_eq!(record.price, Some(12.5));
        assert_eq!(record.stock, 0);
    }

    #[test]
    fn test_header_layout() {
        let header = row(1, &["Name", "ID", "Image URL", "price", "name-en", "Stock"]);
        let layout = ColumnLayout::from_header(&header).unwrap();
        assert_eq!(layout.position(ColumnKey::Id), Some(1));
        assert_eq!(
            layout.position(ColumnKey::Localized(Locale::Zh, LocalizedField::Name)),
            Some(0)
        );
        assert_eq!(layout.position(ColumnKey::ImageUrl), Some(2));
        assert_eq!(layout.position(ColumnKey::Category), None);

        let m = RowMapper::new(layout, LocaleMode::Bilingual, PricePolicy::Lenient);
        let record = m
            .map_row(&row(2, &["杯子", "3", "https://img/3.png", "8", "Cup", "2"]))
            .unwrap();
        assert_eq!(record.id, 3);
        assert_eq!(record.stock, 2);
        assert_eq!(record.image_url.as_deref(), Some("https://img/3.png"));
        assert_eq!(record.field(Locale::En, LocalizedField::Name), Some("Cup"));
    }

    #[test]
    fn test_header_layout_requires_id_and_name() {
        let header = row(1, &["sku", "title", "price"]);
        match ColumnLayout::from_header(&header) {
            Err(SyncError::SourceConfigInvalid(msg)) => {
                assert!(msg.contains("id"));
                assert!(msg.contains("name"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_name_zh_alias() {
        let header = row(1, &["id", "name_zh", "display_description_en"]);
        let layout = ColumnLayout::from_header(&header).unwrap();
        assert_eq!(
            layout.position(ColumnKey::Localized(Locale::Zh, LocalizedField::Name)),
            Some(1)
        );
        assert_eq!(
            layout.position(ColumnKey::Localized(
                Locale::En,
                LocalizedField::DisplayDescription
            )),
            Some(2)
        );
    }
}
