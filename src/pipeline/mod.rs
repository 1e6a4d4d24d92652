pub mod stage1_discover;
pub mod stage2_evaluate;
pub mod stage3_aggregate;
pub mod stage4_report;
