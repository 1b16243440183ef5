#![allow(dead_code)]

use resource_sdk::{Column, CrudService, MemoryClient, Table};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

pub struct Users;

impl Table for Users {
    type Select = User;
    type Insert = NewUser;
    type Update = UserPatch;
    const NAME: &'static str = "users";

    fn columns() -> &'static [Column] {
        static COLUMNS: &[Column] = &[
            Column::new("id", "int8").with_default(),
            Column::new("name", "text"),
            Column::new("email", "text"),
        ];
        COLUMNS
    }
}

/// John, Amy (jo@x.com) and Bob.
pub fn seeded_client() -> MemoryClient {
    let client = MemoryClient::new();
    client.seed(
        &Users::table_ref(),
        [
            json!({"id": 1, "name": "John", "email": null}),
            json!({"id": 2, "name": "Amy", "email": "jo@x.com"}),
            json!({"id": 3, "name": "Bob", "email": null}),
        ],
    );
    client
}

pub fn seeded_service() -> (CrudService<Users, MemoryClient>, MemoryClient) {
    let client = seeded_client();
    (CrudService::new(client.clone()), client)
}

pub fn ids(users: &[User]) -> Vec<i64> {
    users.iter().map(|u| u.id).collect()
}
