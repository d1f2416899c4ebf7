//! Answer-context assembly and the default prompt template.

use regula_core::{PromptBuilder, Strictness};
use regula_rank::ScoredCandidate;

const SEPARATOR_WIDTH: usize = 80;

/// Render selected chunks as numbered document blocks.
///
/// Each block is headed `### DOKUMEN #i: <file>` so the model (and the
/// citation check) can refer to exactly the documents supplied.
pub fn format_context(selected: &[ScoredCandidate], strictness: Strictness) -> String {
    let mut context = match strictness {
        Strictness::Strict => "## DOKUMEN YANG TERSEDIA DI SISTEM (MODE STRICT)\n\n".to_string(),
        Strictness::Lenient => "## DOKUMEN YANG TERSEDIA DI SISTEM\n\n".to_string(),
    };
    let separator = "=".repeat(SEPARATOR_WIDTH);

    for (i, candidate) in selected.iter().enumerate() {
        let chunk = &candidate.chunk;
        context.push_str(&format!(
            "### DOKUMEN #{}: {}\n**Halaman:** {}\n**Skor Relevansi:** {:.1}\n\n**ISI DOKUMEN:**\n{}\n\n{}\n\n",
            i + 1,
            chunk.source,
            chunk.page,
            candidate.score,
            chunk.content,
            separator,
        ));
    }
    context
}

const TEMPLATE: &str = "\
Anda adalah asisten regulasi perbankan Indonesia. Jawab hanya dari teks dokumen di bawah.

ATURAN:
1. Gunakan hanya isi bagian **ISI DOKUMEN**. Jangan memakai pengetahuan umum atau asumsi.
2. Jangan menyebut atau mengutip regulasi yang tidak tercantum sebagai \"### DOKUMEN #X\".
3. Jika informasi tidak ada di dokumen, jawab: \"Informasi tersebut tidak ditemukan dalam dokumen yang tersedia.\"
4. Untuk pertanyaan \"Apa yang dimaksud dengan <regulasi>?\", jawab dengan judul resmi regulasi
   (kalimat yang diawali \"TENTANG\") bila tercantum di dokumen, tanpa tambahan tafsiran.
5. Sertakan sitasi dengan format [NamaFile.pdf], Halaman [X].

{context}

PERTANYAAN: {question}

JAWABAN:";

/// Default prompt: fixed Indonesian instructions around the context.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextPromptBuilder;

impl PromptBuilder for ContextPromptBuilder {
    fn build(&self, context: &str, question: &str) -> String {
        TEMPLATE
            .replace("{context}", context)
            .replace("{question}", question)
    }
}
