pub mod cache;
pub mod core;
pub mod process;
pub mod query;
pub mod reader;
pub mod store;

/*
┌──────────────────────────────────────────────────────────────────────────┐
│                        ALERTDEX STRUCT ARCHITECTURE                      │
└──────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── STORE LAYER ─────────────────────────────┐
│                                                                          │
│  ┌────────────────────────────────────────────────────────────────┐     │
│  │                       struct AlertStore                         │     │
│  │  ┌──────────────────────────────────────────────────────────┐  │     │
│  │  │ log: LogFile                  // NDJSON source           │  │     │
│  │  │ processor: AlertProcessor     // normalize + identity    │  │     │
│  │  │ cache: AlertCache             // bounded LRU, authority  │  │     │
│  │  │ indexes: RwLock<AlertIndexes> // agent / rule / time     │  │     │
│  │  │ state: RwLock<StoreState>     // Empty→Loading→Ready     │  │     │
│  │  └──────────────────────────────────────────────────────────┘  │     │
│  └────────────────────────────────────────────────────────────────┘     │
│                                                                          │
│  ┌──────────────────────┐  ┌──────────────────────────────────────┐     │
│  │ struct AlertIndexes  │  │ metrics: severity_distribution,      │     │
│  │ • by_agent: Map      │  │ agent_metrics, timeline              │     │
│  │ • by_rule: Map       │  └──────────────────────────────────────┘     │
│  │ • by_time: Vec       │                                               │
│  └──────────────────────┘                                               │
└──────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── READ LAYER ──────────────────────────────┐
│                                                                          │
│  ┌──────────────────┐  ┌───────────────────┐  ┌───────────────────┐     │
│  │ struct LogFile   │  │ ForwardReader     │  │ ReverseReader     │     │
│  │ • path           │  │ • file order      │  │ • chunked reverse │     │
│  │ • chunk_size     │  │ • skip malformed  │  │ • carry buffer    │     │
│  └──────────────────┘  └───────────────────┘  │ • early exit      │     │
│                                               └───────────────────┘     │
└──────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────── PROCESS LAYER ────────────────────────────┐
│                                                                          │
│  ┌────────────────────┐  ┌──────────────────┐  ┌──────────────────┐     │
│  │ AlertProcessor     │  │ FieldNormalizer  │  │ trait Enricher   │     │
│  │ • identity (xxh3)  │  │ • alias rewrite  │  │ • enrich()       │     │
│  │ • validation       │  └──────────────────┘  └──────────────────┘     │
│  └────────────────────┘                                                  │
└──────────────────────────────────────────────────────────────────────────┘

┌──────────────────────────────── RELATIONSHIPS ───────────────────────────┐
│                                                                          │
│  AlertStore ──load──> ReverseReader ──lines──> AlertProcessor            │
│      │                                              │                    │
│      │                                    accepted alerts                │
│      │                                              │                    │
│      ├──puts──> AlertCache <──revalidates── list/search/metrics          │
│      │                                                                   │
│      └──appends──> AlertIndexes (sorted ascending after load)            │
│                                                                          │
└──────────────────────────────────────────────────────────────────────────┘
*/
