use cards_core::model::{
    Card, CardId, CardType, CardTypeId, ChoiceOption, ItemId, OptionId, OrderedItem, QuizId,
    QuizKind, ResultSummary,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps driver errors, turning constraint violations into domain-level storage errors.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StorageError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return StorageError::NotFound;
        }
    }
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn card_type_id_from_i64(v: i64) -> Result<CardTypeId, StorageError> {
    Ok(CardTypeId::new(i64_to_u64("card_type_id", v)?))
}

pub(crate) fn card_id_from_i64(v: i64) -> Result<CardId, StorageError> {
    Ok(CardId::new(i64_to_u64("card_id", v)?))
}

pub(crate) fn option_id_from_i64(v: i64) -> Result<OptionId, StorageError> {
    Ok(OptionId::new(i64_to_u64("option_id", v)?))
}

pub(crate) fn item_id_from_i64(v: i64) -> Result<ItemId, StorageError> {
    Ok(ItemId::new(i64_to_u64("item_id", v)?))
}

pub(crate) fn quiz_id_from_i64(v: i64) -> Result<QuizId, StorageError> {
    Ok(QuizId::new(i64_to_u64("quiz_id", v)?))
}

pub(crate) fn map_card_type_row(row: &SqliteRow) -> Result<CardType, StorageError> {
    CardType::new(
        card_type_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_card_row(row: &SqliteRow) -> Result<Card, StorageError> {
    Card::new(
        card_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        card_type_id_from_i64(row.try_get::<i64, _>("type_id").map_err(ser)?)?,
        row.try_get::<String, _>("front").map_err(ser)?,
        row.try_get::<String, _>("back").map_err(ser)?,
        row.try_get::<bool, _>("known").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_option_row(row: &SqliteRow) -> Result<ChoiceOption, StorageError> {
    ChoiceOption::new(
        option_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        card_id_from_i64(row.try_get::<i64, _>("card_id").map_err(ser)?)?,
        row.try_get::<String, _>("choice").map_err(ser)?,
        row.try_get::<bool, _>("is_correct").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_item_row(row: &SqliteRow) -> Result<OrderedItem, StorageError> {
    OrderedItem::new(
        item_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        card_id_from_i64(row.try_get::<i64, _>("card_id").map_err(ser)?)?,
        row.try_get::<String, _>("item").map_err(ser)?,
        u32_from_i64("position", row.try_get::<i64, _>("position").map_err(ser)?)?,
    )
    .map_err(ser)
}

pub(crate) fn map_result_row(row: &SqliteRow) -> Result<ResultSummary, StorageError> {
    let kind: QuizKind = row
        .try_get::<String, _>("quiz_kind")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    ResultSummary::from_persisted(
        kind,
        quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?,
        u32_from_i64(
            "total_correct",
            row.try_get::<i64, _>("total_correct").map_err(ser)?,
        )?,
        u32_from_i64(
            "total_incorrect",
            row.try_get::<i64, _>("total_incorrect").map_err(ser)?,
        )?,
        row.try_get::<f64, _>("percentage").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}
