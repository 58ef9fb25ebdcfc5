mod task;

pub use task::{Priority, Task, generate_id};
