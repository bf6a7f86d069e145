pub mod line_helpers;
