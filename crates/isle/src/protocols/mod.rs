pub mod compositor;
pub mod output;
pub mod seat;
pub mod shm;
pub mod xdg_shell;
