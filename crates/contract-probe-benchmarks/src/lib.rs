#![warn(missing_docs)]
//! # contract-probe-benchmarks
//!
//! Synthetic payloads for validator throughput smoke tests.

use serde_json::{Value, json};

/// List-users page carrying `users` generated entries.
pub fn synthetic_user_page(users: usize) -> Value {
    let data: Vec<Value> = (1..=users)
        .map(|id| {
            json!({
                "id": id,
                "email": format!("user{id}@reqres.in"),
                "first_name": "Bench",
                "last_name": format!("User{id}"),
                "avatar": format!("https://reqres.in/img/faces/{id}-image.jpg")
            })
        })
        .collect();

    json!({
        "page": 1,
        "per_page": users,
        "total": users,
        "total_pages": 1,
        "data": data,
        "support": {"url": "https://reqres.in/#support-heading", "text": "support"}
    })
}
