//! The simple sequence: IWI -> IR -> OR. Pass-through, test scaffolding
//! only; the compiler never emits it.

use normcode_core::{Element, Inference, Reference};

use super::{ExecutionContext, SequenceError, resolve};

pub fn run(
    inference: &Inference,
    ctx: &mut ExecutionContext<'_>,
) -> Result<Reference, SequenceError> {
    match inference.value_concepts.first() {
        Some(source) => resolve(ctx, source),
        None => Ok(Reference::singleton(Element::Skip)),
    }
}
