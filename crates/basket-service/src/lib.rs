//! # basket-service: Basket Orchestration
//!
//! Ties the pricing engine ([`basket_core`]) to its store ([`basket_db`]).
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Basket Engine Layers                             │
//! │                                                                         │
//! │  caller (HTTP handler, CLI, job, ...)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                basket-service (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │  BasketService ── BasketLocks (one mutex per user)             │   │
//! │  │       │                                                         │   │
//! │  │       ├── ports: BasketStore, ProductCatalog,                   │   │
//! │  │       │          HistoricalAggregates, CheckoutStore            │   │
//! │  │       └── ServiceConfig: DiscountPolicy, failure policy         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                               │                                 │
//! │       ▼                               ▼                                 │
//! │  basket-core (pure pricing)      basket-db (SQLite)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use basket_service::{BasketService, ServiceConfig};
//!
//! let config = ServiceConfig::from_env()?;
//! let service = BasketService::connect(&config).await?;
//!
//! let cart = service.add_item("user-1", &product_id, 2).await?;
//! println!("pay {}", cart.sub_total());
//!
//! let order = service.checkout("user-1").await?;
//! ```

pub mod config;
pub mod error;
pub mod locks;
pub mod ports;
pub mod service;

pub use config::{AggregateFailurePolicy, ConfigError, ServiceConfig};
pub use error::{ErrorCode, ServiceError, ServiceResult};
pub use locks::BasketLocks;
pub use ports::{BasketStore, CheckoutStore, HistoricalAggregates, Ports, ProductCatalog};
pub use service::BasketService;
