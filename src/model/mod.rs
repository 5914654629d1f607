pub mod document;
pub mod plan;
pub mod record;
pub mod report;
pub mod updater;
