// Background jobs

pub mod boost_sweeper;
