pub mod instruction_reader;
pub mod labels;
pub mod report_writer;
