//! User connection entity model
//!
//! One row per link between a local user and a provider account. The three
//! credential columns hold hex ciphertext, never plaintext.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user_connection")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub provider_id: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub provider_user_id: String,

    /// Order among the user's connections to the same provider, starting at 1
    pub rank: i32,

    pub display_name: Option<String>,

    pub profile_url: Option<String>,

    pub image_url: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub access_token: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub secret: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub refresh_token: Option<String>,

    /// Epoch milliseconds
    pub expire_time: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
