//! The ingestion pipeline's internal typestate machine,
//! distinct from `Document`'s own runtime-checked `PENDING/PROCESSING/…`
//! transitions: this one exists purely so a stage function can't be
//! called out of order at compile time.

use state_machines::state_machine;

state_machine! {
    name: IngestionMachine,
    state: IngestionState,
    initial: Ready,
    states: [Ready, ContentPrepared, Chunked, Embedded, Persisted, Failed],
    events {
        prepare { transition: { from: Ready, to: ContentPrepared } }
        chunk { transition: { from: ContentPrepared, to: Chunked } }
        embed { transition: { from: Chunked, to: Embedded } }
        persist { transition: { from: Embedded, to: Persisted } }
        abort {
            transition: { from: Ready, to: Failed }
            transition: { from: ContentPrepared, to: Failed }
            transition: { from: Chunked, to: Failed }
            transition: { from: Embedded, to: Failed }
        }
    }
}

pub fn ready() -> IngestionMachine<(), Ready> {
    IngestionMachine::new(())
}
