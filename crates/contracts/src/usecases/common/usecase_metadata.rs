/// Метаданные UseCase для идентификации в логах и ответах API
pub trait UseCaseMetadata {
    /// Индекс UseCase (например, "u501")
    fn usecase_index() -> &'static str;

    /// Техническое имя (например, "sync_products")
    fn usecase_name() -> &'static str;

    /// Отображаемое имя (например, "Синхронизация товаров из таблицы")
    fn display_name() -> &'static str;

    /// Описание UseCase
    fn description() -> &'static str {
        ""
    }

    /// Полное имя вида "u501_sync_products"
    fn full_name() -> String {
        format!("{}_{}", Self::usecase_index(), Self::usecase_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::u501_sync_products::SyncProductsFromSheet;

    #[test]
    fn test_full_name() {
        assert_eq!(SyncProductsFromSheet::full_name(), "u501_sync_products");
    }
}
