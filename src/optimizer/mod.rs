mod int_histogram;

pub use int_histogram::IntHistogram;
