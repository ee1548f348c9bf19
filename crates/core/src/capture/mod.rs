pub mod acquisition_loop;
pub mod domain;
pub mod infrastructure;
