//! Collaborative event board engine for PartyGeng.
//!
//! Every event on PartyGeng owns a board where clients and vendors pin sticky
//! notes and images. This crate holds the headless side of that board: the
//! post model, the optimistic mutation protocol, pointer-drag and stacking
//! state, card layout, and the compose form. It never touches a DOM or a
//! socket directly; the host wires input events in and draws the
//! [`render::Scene`] it gets back, while a [`store::RemoteStore`]
//! implementation talks to the backend.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`doc`] | Board posts, wire payloads, and the local post list |
//! | [`store`] | Remote store port, change subscriptions, store errors |
//! | [`memory`] | In-process store backend (tests, offline demos) |
//! | [`optimistic`] | Snapshot → apply → commit-or-rollback transactions |
//! | [`drag`] | Per-post pointer-drag state machine |
//! | [`focus`] | Session-scoped z-order manager |
//! | [`render`] | Canvas bounds and note/image card view models |
//! | [`compose`] | The "Add Pin" input station |
//! | [`session`] | One viewer's open board, tying everything together |
//! | [`consts`] | Palette, margins, spawn ranges |

pub mod compose;
pub mod consts;
pub mod doc;
pub mod drag;
pub mod focus;
pub mod memory;
pub mod optimistic;
pub mod render;
pub mod session;
pub mod store;
