pub mod repeat_label;
