//! Snapgate Delivery - the viewer side of a snapshot
//!
//! Checks gate passwords, serves snapshot files behind the gate cookie,
//! counts unique viewers and routes comment traffic to the thread
//! collaborator.
//!
//! # Outcomes
//!
//! | Situation | Result |
//! |---|---|
//! | unknown id, `creating`, file missing from manifest | `not_found` |
//! | expired or revoked | `gone` |
//! | gate closed, index route | password prompt (401) |
//! | gate closed, any other path | `unauthorized` |
//! | wrong gate password | `forbidden` |

#![forbid(unsafe_code)]

pub mod gate;
pub mod handler;
pub mod prompt;

pub use gate::{gate_cookie_name, gate_cookie_path, GatePass, GATE_COOKIE_PREFIX};
pub use handler::{
    CommentRequest, Delivery, GatedDelivery, ServedAsset, Viewer, FALLBACK_CONTENT_TYPE,
    MAX_AUTHOR_LEN, MAX_COMMENT_LEN,
};
pub use prompt::password_prompt;
