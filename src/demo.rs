//! Interactive demo harness: canned calls, directory and follow-up showcases,
//! and a free-form chat mode.

use std::io::{self, Write};
use std::sync::Arc;

use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::warn;

use crate::actions::{ActionDispatcher, FollowUpTarget};
use crate::config::AgentConfig;
use crate::conversation::{ConversationEngine, ConversationSummary};
use crate::directory::{DirectoryClient, HIGH_VOLUME_THRESHOLD, NewPharmacy};
use crate::llm::LlmProvider;
use crate::templates::{self, Confirmation};

/// A scripted call: who calls and what they say.
pub struct Script {
    pub title: &'static str,
    pub intro: &'static str,
    pub phone: &'static str,
    pub messages: &'static [&'static str],
}

pub const EXISTING_CUSTOMER: Script = Script {
    title: "DEMO: Existing Customer Call",
    intro: "Starting call from existing customer...",
    phone: "555-123-4567",
    messages: &[
        "Hi, we're having some issues with our current system and wanted to see what you can offer.",
        "Yes, we're definitely interested in upgrading. Our current system is quite outdated.",
        "That sounds great! Could we set up a consultation call?",
        "Next week works. How about Tuesday at 2 PM?",
        "No, that's all. Thanks for your help.",
    ],
};

pub const NEW_LEAD: Script = Script {
    title: "DEMO: New Lead Call",
    intro: "Starting call from new lead...",
    phone: "555-999-9999",
    messages: &[
        "It's Sunset Pharmacy",
        "San Diego",
        "We're expecting to process about 800 prescriptions per month initially.",
        "Sarah Johnson",
        "My email is sarah@sunsetpharmacy.com",
        "Yes, we're very interested in learning more about your solutions.",
        "Email would be great! Please send us the information.",
        "No, that's everything. Thanks so much!",
    ],
};

pub const HIGH_VOLUME: Script = Script {
    title: "DEMO: High Volume Pharmacy Call",
    intro: "Starting call from high volume pharmacy...",
    phone: "555-777-8888",
    messages: &[
        "Hello, we're looking to upgrade our management system.",
        "We're Mega Pharmacy",
        "Los Angeles",
        "We're processing about 2000 prescriptions per month.",
        "Mike Rodriguez",
        "mike@megapharmacy.com",
        "Yes, please send us the detailed information about your high-volume program.",
        "Email is best for us.",
        "Perfect, goodbye!",
    ],
};

/// Drive `engine` through `script`, echoing the exchange to stdout.
pub async fn play_script(engine: &mut ConversationEngine, script: &Script) -> ConversationSummary {
    print_header(script.title);
    println!("📞 {}", script.intro);
    println!("Bot: {}", engine.start_call(script.phone).await);

    for message in script.messages {
        println!("\nUser: {message}");
        println!("Bot: {}", engine.process_message(message).await);
    }

    let summary = engine.summary();
    print_summary(&summary);
    summary
}

pub struct Demo {
    agent: AgentConfig,
    directory: Arc<DirectoryClient>,
    llm: Option<Arc<dyn LlmProvider>>,
    /// Writes to the directory are only demonstrated against the local mock.
    local_directory: bool,
    input: Lines<BufReader<Stdin>>,
}

impl Demo {
    pub fn new(
        agent: AgentConfig,
        directory: Arc<DirectoryClient>,
        llm: Option<Arc<dyn LlmProvider>>,
        local_directory: bool,
    ) -> Self {
        Self {
            agent,
            directory,
            llm,
            local_directory,
            input: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Show the menu until the user exits or stdin closes.
    pub async fn run(&mut self) -> io::Result<()> {
        print_header("PHARMACY SALES AGENT DEMO");
        println!("Welcome to the Pharmesol Pharmacy Sales Agent Demo!");
        println!("\nThis demo showcases:");
        println!("• Existing customer recognition and personalized service");
        println!("• New lead information collection");
        println!("• High volume pharmacy special handling");
        println!("• Integration with the pharmacy directory");
        println!("• Follow-up action management (emails, callbacks)");
        println!("• Conversation flow management");

        loop {
            print_separator();
            println!("Choose a demo option:");
            println!("1. Existing Customer Demo");
            println!("2. New Lead Demo");
            println!("3. High Volume Pharmacy Demo");
            println!("4. Directory Integration Demo");
            println!("5. Follow-up Actions Demo");
            println!("6. Interactive Demo");
            println!("7. Run All Demos");
            println!("0. Exit");

            let Some(choice) = self.prompt("\nEnter your choice (0-7): ").await? else {
                break;
            };

            match choice.as_str() {
                "0" => {
                    println!("Thanks for trying the demo!");
                    break;
                }
                "1" => self.existing_customer().await,
                "2" => self.new_lead().await,
                "3" => self.high_volume().await,
                "4" => self.directory_integration().await,
                "5" => follow_up_actions().await,
                "6" => self.interactive().await?,
                "7" => {
                    self.directory_integration().await;
                    follow_up_actions().await;
                    self.existing_customer().await;
                    self.new_lead().await;
                    self.high_volume().await;
                }
                _ => println!("Invalid choice. Please try again."),
            }
        }
        Ok(())
    }

    fn engine(&self) -> ConversationEngine {
        ConversationEngine::new(
            self.agent.clone(),
            self.directory.clone(),
            ActionDispatcher::new(),
            self.llm.clone(),
        )
    }

    async fn existing_customer(&self) {
        let mut engine = self.engine();
        play_script(&mut engine, &EXISTING_CUSTOMER).await;
    }

    async fn new_lead(&self) {
        let mut engine = self.engine();
        play_script(&mut engine, &NEW_LEAD).await;
    }

    async fn high_volume(&self) {
        let mut engine = self.engine();
        let summary = play_script(&mut engine, &HIGH_VOLUME).await;

        let Some(info) = summary.collected_info else {
            return;
        };
        let volume = info.volume();
        if volume >= HIGH_VOLUME_THRESHOLD {
            println!("\n📈 High-volume follow-up:");
            println!("{}", templates::high_volume_message(volume));

            let target = FollowUpTarget {
                pharmacy_name: info.pharmacy_name.unwrap_or_default(),
                contact_person: info.contact_person.unwrap_or_default(),
                email: info.email,
                phone: HIGH_VOLUME.phone.to_string(),
                rx_volume: volume,
            };
            let receipt = engine.dispatcher().send_high_volume_offer(&target).await;
            println!("{}", receipt.message);
        }
    }

    async fn directory_integration(&self) {
        print_header("DEMO: Directory Integration");

        println!("🔍 Checking directory availability...");
        if !self.directory.is_available().await {
            println!("Directory at {} is not reachable.", self.directory.base_url());
            return;
        }

        println!("🔍 Fetching all pharmacies...");
        match self.directory.list_all().await {
            Ok(pharmacies) => {
                println!("Found {} pharmacies in the system", pharmacies.len());
                if !pharmacies.is_empty() {
                    println!("\n📋 Sample pharmacy data:");
                    for (i, p) in pharmacies.iter().take(3).enumerate() {
                        println!("{}. {} - {} - {} Rx/month", i + 1, p.name, p.location, p.rx_volume);
                    }
                }
            }
            Err(e) => {
                println!("Error accessing directory: {e}");
                return;
            }
        }

        println!("\n🔍 Looking up specific pharmacy by phone...");
        match self.directory.find_by_phone("555-123-4567").await {
            Ok(Some(p)) => println!("Found: {} in {}", p.name, p.location),
            Ok(None) => println!("Pharmacy not found"),
            Err(e) => println!("Lookup failed: {e}"),
        }

        println!("\n🏆 High volume pharmacies ({HIGH_VOLUME_THRESHOLD}+ Rx/month):");
        match self.directory.high_volume(HIGH_VOLUME_THRESHOLD).await {
            Ok(pharmacies) => {
                for p in pharmacies {
                    println!("• {}: {} Rx/month", p.name, p.rx_volume);
                }
            }
            Err(e) => println!("Query failed: {e}"),
        }

        if !self.local_directory {
            return;
        }

        println!("\n➕ Registering a new pharmacy...");
        let new = NewPharmacy {
            name: "Riverside Pharmacy".into(),
            phone: "555-222-3333".into(),
            location: "Sacramento, CA".into(),
            rx_volume: 450,
            contact_person: "Dana Fox".into(),
            email: Some("dana@riversiderx.com".into()),
            notes: None,
        };
        let created = match self.directory.create(&new).await {
            Ok(record) => {
                println!("Created {} with id {}", record.name, record.id);
                record
            }
            Err(e) => {
                println!("Create failed: {e}");
                return;
            }
        };

        match self
            .directory
            .update(&created.id, &json!({"rx_volume": 1100, "notes": "Expanding to two locations"}))
            .await
        {
            Ok(record) => println!(
                "Updated {}: {} Rx/month (high volume: {})",
                record.name,
                record.rx_volume,
                record.is_high_volume()
            ),
            Err(e) => println!("Update failed: {e}"),
        }
    }

    async fn interactive(&mut self) -> io::Result<()> {
        print_header("INTERACTIVE DEMO");
        if self.llm.is_none() {
            warn!("No language model available, interactive demo runs in manual mode");
            println!("⚠️  No OpenAI connection: replies use the scripted manual mode.");
        }

        let phone = self
            .prompt("Enter a phone number to simulate the call: ")
            .await?
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "555-123-4567".to_string());

        let mut engine = self.engine();
        println!("\n📞 Starting call from {phone}...");
        println!("Bot: {}", engine.start_call(&phone).await);
        println!("\n💬 Start chatting with the bot! (Type 'quit' to exit)");

        while let Some(line) = self.prompt("\nYou: ").await? {
            if matches!(line.to_lowercase().as_str(), "quit" | "exit" | "bye") {
                println!("Bot: Thank you for calling Pharmesol! Have a great day!");
                break;
            }
            if !line.is_empty() {
                println!("Bot: {}", engine.process_message(&line).await);
            }
        }

        let summary = engine.summary();
        print_summary(&summary);
        if let Some(info) = &summary.collected_info
            && !info.is_complete()
        {
            println!("\n{}", templates::missing_info_message(&info.missing()));
        }
        Ok(())
    }

    /// Print `prompt` and read one trimmed line. `None` on end of input.
    async fn prompt(&mut self, prompt: &str) -> io::Result<Option<String>> {
        print!("{prompt}");
        io::stdout().flush()?;
        Ok(self
            .input
            .next_line()
            .await?
            .map(|line| line.trim().to_string()))
    }
}

async fn follow_up_actions() {
    print_header("DEMO: Follow-up Actions");
    let dispatcher = ActionDispatcher::new();

    let target = FollowUpTarget {
        pharmacy_name: "Demo Pharmacy".into(),
        contact_person: "Demo Manager".into(),
        email: Some("demo@pharmacy.com".into()),
        phone: "555-123-4567".into(),
        rx_volume: 1500,
    };

    println!("📧 Testing email functionality...");
    println!("{}", templates::email_offer(&target.pharmacy_name, "demo@pharmacy.com"));

    let receipt = dispatcher.send_welcome_email(&target).await;
    println!("\nWelcome email #{}: {}", receipt.email_id, receipt.message);
    println!("{}", templates::confirmation_message(Confirmation::EmailSent));

    let receipt = dispatcher.send_high_volume_offer(&target).await;
    println!("High volume offer #{}: {}", receipt.email_id, receipt.message);

    let receipt = dispatcher.schedule_consultation(&target, "tomorrow at 3 PM").await;
    println!("Consultation #{}: {}", receipt.callback_id, receipt.message);
    println!("{}", templates::confirmation_message(Confirmation::CallbackScheduled));

    let emails = dispatcher.email_history().await;
    let callbacks = dispatcher.callback_history().await;
    println!("\n📊 Action History:");
    println!("Emails sent: {}", emails.len());
    println!("Callbacks scheduled: {}", callbacks.len());

    let recap = emails
        .iter()
        .map(|e| format!("• Email \"{}\" to {}", e.request.subject, e.request.to_email))
        .chain(callbacks.iter().map(|c| {
            format!("• Consultation with {} {}", c.request.contact_person, c.request.preferred_time)
        }))
        .collect::<Vec<_>>()
        .join("\n");
    println!(
        "\n{}",
        templates::next_steps(&recap, templates::confirmation_message(Confirmation::SpecialistContact))
    );
}

fn print_summary(summary: &ConversationSummary) {
    print_separator();
    println!("📊 CONVERSATION SUMMARY");
    println!("Call: {} (started {})", summary.call_id, summary.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("State: {}", summary.state);
    match (&summary.caller, &summary.collected_info) {
        (Some(caller), _) => {
            println!("Pharmacy: {}", caller.name);
            println!("Rx Volume: {}", caller.rx_volume);
        }
        (None, Some(info)) => match serde_json::to_string(info) {
            Ok(json) => println!("Collected Info: {json}"),
            Err(e) => println!("Collected Info: <unprintable: {e}>"),
        },
        (None, None) => println!("Pharmacy: New Lead"),
    }
    println!("Conversation length: {} messages", summary.transcript_length);
    println!("AI Available: {}", summary.ai_available);
    println!("Emails Sent: {}", summary.emails_sent);
    println!("Callbacks Scheduled: {}", summary.callbacks_scheduled);
}

fn print_separator() {
    println!("\n{}\n", "=".repeat(60));
}

fn print_header(title: &str) {
    print_separator();
    println!("🤖 {title}");
    print_separator();
}
