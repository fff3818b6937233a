/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Diesel schema definitions for both database backends.
//!
//! The two backends store the same logical schema with backend-native column
//! types: PostgreSQL uses TIMESTAMP and BOOLEAN, SQLite stores timestamps as
//! RFC3339 TEXT and booleans as INTEGER 0/1. Enum-valued columns
//! (`lifecycle_state`, `locale`, `reason`) are TEXT on both backends and are
//! parsed into domain enums at the DAL boundary.

/// PostgreSQL schema definitions.
pub mod postgres {
    diesel::table! {
        slots (id) {
            id -> Int4,
            start_time -> Timestamp,
            end_time -> Timestamp,
            enabled -> Bool,
            email -> Varchar,
            organization -> Text,
            #[max_length = 50]
            namespace -> Varchar,
            #[max_length = 50]
            password -> Varchar,
            #[max_length = 16]
            lifecycle_state -> Nullable<Varchar>,
            #[max_length = 2]
            locale -> Nullable<Varchar>,
        }
    }

    diesel::table! {
        mails (time_to_send, email, reason, locale) {
            time_to_send -> Timestamp,
            email -> Varchar,
            #[max_length = 16]
            reason -> Varchar,
            #[max_length = 2]
            locale -> Varchar,
            data -> Text,
            sent -> Bool,
        }
    }

    diesel::allow_tables_to_appear_in_same_query!(slots, mails);
}

/// SQLite schema definitions.
pub mod sqlite {
    diesel::table! {
        slots (id) {
            id -> Integer,
            start_time -> Text,
            end_time -> Text,
            enabled -> Integer,
            email -> Text,
            organization -> Text,
            namespace -> Text,
            password -> Text,
            lifecycle_state -> Nullable<Text>,
            locale -> Nullable<Text>,
        }
    }

    diesel::table! {
        mails (time_to_send, email, reason, locale) {
            time_to_send -> Text,
            email -> Text,
            reason -> Text,
            locale -> Text,
            data -> Text,
            sent -> Integer,
        }
    }

    diesel::allow_tables_to_appear_in_same_query!(slots, mails);
}
