// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one command.
//
// Rules for this layer:
//   - No tensor code here (that's Layer 5)
//   - No argument parsing (that's Layer 1)
//   - Only workflow coordination and error context
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow and its configuration
pub mod train_use_case;

// Dataset validation and split preview
pub mod inspect_use_case;

// Scoring a CSV with a saved checkpoint
pub mod evaluate_use_case;
