//! Fixed prompt text. Downstream evaluation matches the sentinel and the
//! citation format literally, so both are kept word for word.

pub const SYSTEM_DIRECTIVE: &str = "Sei un assistente per domande su whitepaper crypto e sul Regolamento MiCA (UE). \
Rispondi SOLO usando i contenuti presenti nei CHUNK forniti. \
Se non trovi informazioni sufficienti, rispondi: 'Non ho evidenze sufficienti nei documenti indicizzati.' \
Includi SEMPRE citazioni in forma [SOURCE: <titolo> | chunk <id>]. ";

pub fn user_turn(question: &str, context: &str) -> String {
    format!(
        "Domanda: {question}\n\nCHUNK:\n{context}\n\nRispondi in modo conciso e includi sempre citazioni [SOURCE: titolo | chunk]."
    )
}
