pub mod reportgen;
