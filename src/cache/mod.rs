pub mod alert_cache;
