use crate::models::RetrievedChunk;

/// Fixed reply the model is instructed to give when the context lacks the answer.
pub const NOT_FOUND_ANSWER: &str =
    "Bu sorunun cevabı sağlanan veri kaynağında bulunmamaktadır.";

const PREAMBLE: &str = "Sen İstanbul Büyükşehir Belediyesi'nin (İBB) faaliyet raporu konusunda uzman bir asistansın.
Cevaplarını yalnızca rapor içeriğindeki bilgilere dayanarak ver.
Kullanıcı, İBB'nin yaptığı faaliyetler, projeler, harcamalar veya performans göstergeleri hakkında sorular soracak.
Cevaplarını Türkçe, açık ve profesyonel bir dille ver.";

pub fn build_context(hits: &[RetrievedChunk]) -> String {
    hits.iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_prompt(context: &str, question: &str) -> String {
    format!(
        "{PREAMBLE}\nEğer sorunun cevabı metinde yoksa, '{NOT_FOUND_ANSWER}' şeklinde cevapla.\n\n\
         Bağlam:\n{context}\n\n\
         Soru: {question}\n\n\
         Cevap:"
    )
}
