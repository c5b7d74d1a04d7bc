use state_machines::state_machine;

state_machine! {
    name: IngestionMachine,
    state: IngestionState,
    initial: Ready,
    states: [Ready, Chunked, Stubbed, Enriched, Committed, Failed],
    events {
        chunk { transition: { from: Ready, to: Chunked } }
        stub { transition: { from: Chunked, to: Stubbed } }
        enrich { transition: { from: Stubbed, to: Enriched } }
        commit { transition: { from: Enriched, to: Committed } }
        abort {
            transition: { from: Ready, to: Failed }
            transition: { from: Chunked, to: Failed }
            transition: { from: Stubbed, to: Failed }
            transition: { from: Enriched, to: Failed }
        }
    }
}

pub fn ready() -> IngestionMachine<(), Ready> {
    IngestionMachine::new(())
}
