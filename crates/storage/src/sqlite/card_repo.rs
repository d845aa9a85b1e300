use cards_core::model::{
    Card, CardError, CardId, CardType, CardTypeId, ChoiceOption, OrderedItem,
};

use super::SqliteRepository;
use super::mapping::{
    card_id_from_i64, card_type_id_from_i64, db_err, id_i64, item_id_from_i64, map_card_row,
    map_card_type_row, map_item_row, map_option_row, option_id_from_i64,
};
use crate::repository::{
    CardRepository, NewCardRecord, NewItemRecord, NewOptionRecord, StorageError,
};

fn require_text(text: &str, err: CardError) -> Result<(), StorageError> {
    if text.trim().is_empty() {
        return Err(err.into());
    }
    Ok(())
}

#[async_trait::async_trait]
impl CardRepository for SqliteRepository {
    async fn insert_card_type(&self, name: &str) -> Result<CardType, StorageError> {
        let name = name.trim();
        require_text(name, CardError::EmptyTypeName)?;

        let res = sqlx::query("INSERT INTO card_types (name) VALUES (?1)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(CardType::new(
            card_type_id_from_i64(res.last_insert_rowid())?,
            name,
        )?)
    }

    async fn insert_card(&self, card: NewCardRecord) -> Result<Card, StorageError> {
        require_text(&card.front, CardError::EmptyFront)?;

        let res = sqlx::query(
            r"
            INSERT INTO cards (type_id, front, back, known)
            VALUES (?1, ?2, ?3, 0)
            ",
        )
        .bind(id_i64("type_id", card.type_id.value())?)
        .bind(&card.front)
        .bind(&card.back)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(Card::new(
            card_id_from_i64(res.last_insert_rowid())?,
            card.type_id,
            card.front,
            card.back,
            false,
        )?)
    }

    async fn insert_option(&self, option: NewOptionRecord) -> Result<ChoiceOption, StorageError> {
        require_text(&option.text, CardError::EmptyChoice)?;

        let res = sqlx::query(
            r"
            INSERT INTO card_choices (card_id, choice, is_correct)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(id_i64("card_id", option.card_id.value())?)
        .bind(&option.text)
        .bind(option.is_correct)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(ChoiceOption::new(
            option_id_from_i64(res.last_insert_rowid())?,
            option.card_id,
            option.text,
            option.is_correct,
        )?)
    }

    async fn insert_ordered_item(&self, item: NewItemRecord) -> Result<OrderedItem, StorageError> {
        require_text(&item.text, CardError::EmptyItem)?;

        let res = sqlx::query(
            r"
            INSERT INTO card_ordered_items (card_id, item, position)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(id_i64("card_id", item.card_id.value())?)
        .bind(&item.text)
        .bind(i64::from(item.position))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(OrderedItem::new(
            item_id_from_i64(res.last_insert_rowid())?,
            item.card_id,
            item.text,
            item.position,
        )?)
    }

    async fn find_card_type(&self, name: &str) -> Result<Option<CardType>, StorageError> {
        let row = sqlx::query("SELECT id, name FROM card_types WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_card_type_row).transpose()
    }

    async fn list_card_types(&self) -> Result<Vec<CardType>, StorageError> {
        let rows = sqlx::query("SELECT id, name FROM card_types ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(map_card_type_row).collect()
    }

    async fn list_cards_by_type(&self, type_name: &str) -> Result<Vec<Card>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT c.id, c.type_id, c.front, c.back, c.known
            FROM cards c
            JOIN card_types t ON t.id = c.type_id
            WHERE t.name = ?1
            ORDER BY c.id ASC
            ",
        )
        .bind(type_name)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_card_row).collect()
    }

    async fn get_card(&self, id: CardId) -> Result<Option<Card>, StorageError> {
        let row = sqlx::query("SELECT id, type_id, front, back, known FROM cards WHERE id = ?1")
            .bind(id_i64("card_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_card_row).transpose()
    }

    async fn options_for_card(&self, id: CardId) -> Result<Vec<ChoiceOption>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, card_id, choice, is_correct
            FROM card_choices
            WHERE card_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_i64("card_id", id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_option_row).collect()
    }

    async fn ordered_items_for_card(&self, id: CardId) -> Result<Vec<OrderedItem>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, card_id, item, position
            FROM card_ordered_items
            WHERE card_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(id_i64("card_id", id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(map_item_row).collect()
    }

    async fn set_known(&self, id: CardId, known: bool) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE cards SET known = ?1 WHERE id = ?2")
            .bind(known)
            .bind(id_i64("card_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn clear_known(&self, type_id: CardTypeId) -> Result<u64, StorageError> {
        let res = sqlx::query("UPDATE cards SET known = 0 WHERE type_id = ?1")
            .bind(id_i64("type_id", type_id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(res.rows_affected())
    }
}
